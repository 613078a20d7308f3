
use core::fmt;
use std::collections::HashMap;

use crate::api::coroutine::CoroutineError;
use crate::api::promise::Promise;

/// Tagged message payload with best-effort typed accessors.
///
/// The accessors never panic and never error: a conversion mismatch resolves
/// to a type-appropriate default (`None`, `0`, `0.0`). Numeric accessors
/// cross-convert between the numeric variants and parse numeric text, in the
/// spirit of the dynamic accessors this type replaces.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Payload {
  /// Absent value; the default.
  #[default]
  Nil,
  /// Boolean.
  Bool(bool),
  /// Signed integer.
  Int(i64),
  /// Floating point number.
  Float(f64),
  /// UTF-8 text.
  Text(String),
  /// Ordered list of payloads.
  List(Vec<Payload>),
  /// String-keyed map of payloads.
  Map(HashMap<String, Payload>),
}

impl Payload {
  /// True for [`Payload::Nil`].
  pub fn is_nil(&self) -> bool {
    matches!(self, Payload::Nil)
  }

  /// The text content, or `None` for any other variant.
  pub fn text(&self) -> Option<&str> {
    match self {
      | Payload::Text(value) => Some(value),
      | _ => None,
    }
  }

  /// Signed-integer view: integers as-is, floats truncated, booleans as 0/1,
  /// numeric text parsed; everything else is 0.
  pub fn int(&self) -> i64 {
    match self {
      | Payload::Int(value) => *value,
      | Payload::Float(value) => *value as i64,
      | Payload::Bool(value) => i64::from(*value),
      | Payload::Text(value) => value.trim().parse().unwrap_or(0),
      | _ => 0,
    }
  }

  /// Unsigned view of [`Payload::int`]; negative values clamp to 0.
  pub fn uint(&self) -> u64 {
    self.int().try_into().unwrap_or(0)
  }

  /// Floating-point view with the same coercions as [`Payload::int`];
  /// mismatches resolve to 0.0.
  pub fn float(&self) -> f64 {
    match self {
      | Payload::Float(value) => *value,
      | Payload::Int(value) => *value as f64,
      | Payload::Bool(value) => f64::from(u8::from(*value)),
      | Payload::Text(value) => value.trim().parse().unwrap_or(0.0),
      | _ => 0.0,
    }
  }

  /// The list content, or `None` for any other variant.
  pub fn list(&self) -> Option<&[Payload]> {
    match self {
      | Payload::List(values) => Some(values),
      | _ => None,
    }
  }

  /// The map content, or `None` for any other variant.
  pub fn map(&self) -> Option<&HashMap<String, Payload>> {
    match self {
      | Payload::Map(values) => Some(values),
      | _ => None,
    }
  }
}

impl From<()> for Payload {
  fn from(_: ()) -> Self {
    Payload::Nil
  }
}

impl From<bool> for Payload {
  fn from(value: bool) -> Self {
    Payload::Bool(value)
  }
}

impl From<i32> for Payload {
  fn from(value: i32) -> Self {
    Payload::Int(i64::from(value))
  }
}

impl From<i64> for Payload {
  fn from(value: i64) -> Self {
    Payload::Int(value)
  }
}

impl From<f64> for Payload {
  fn from(value: f64) -> Self {
    Payload::Float(value)
  }
}

impl From<&str> for Payload {
  fn from(value: &str) -> Self {
    Payload::Text(value.to_string())
  }
}

impl From<String> for Payload {
  fn from(value: String) -> Self {
    Payload::Text(value)
  }
}

impl From<Vec<Payload>> for Payload {
  fn from(values: Vec<Payload>) -> Self {
    Payload::List(values)
  }
}

impl From<HashMap<String, Payload>> for Payload {
  fn from(values: HashMap<String, Payload>) -> Self {
    Payload::Map(values)
  }
}

/// Message sent to an actor: an immutable payload plus the promise the
/// sender awaits for the reply.
#[derive(Clone)]
pub struct Envelope {
  payload: Payload,
  promise: Promise<Payload>,
}

impl Envelope {
  /// Pairs `payload` with its reply promise.
  pub fn new(payload: Payload, promise: Promise<Payload>) -> Self {
    Self { payload, promise }
  }

  /// The message content.
  pub fn payload(&self) -> &Payload {
    &self.payload
  }

  /// The reply promise the sender is awaiting.
  pub fn promise(&self) -> &Promise<Payload> {
    &self.promise
  }

  /// Replies to the sender. First settlement wins; returns false when the
  /// envelope was already settled.
  pub fn complete(&self, value: impl Into<Payload>) -> bool {
    self.promise.complete(value.into())
  }

  /// Replies to the sender with an error. Same first-wins contract as
  /// [`Envelope::complete`].
  pub fn fail(&self, error: CoroutineError) -> bool {
    self.promise.fail(error)
  }

  /// Payload nil check; see [`Payload::is_nil`].
  pub fn is_nil(&self) -> bool {
    self.payload.is_nil()
  }

  /// Payload text accessor; see [`Payload::text`].
  pub fn text(&self) -> Option<&str> {
    self.payload.text()
  }

  /// Payload integer accessor; see [`Payload::int`].
  pub fn int(&self) -> i64 {
    self.payload.int()
  }

  /// Payload unsigned accessor; see [`Payload::uint`].
  pub fn uint(&self) -> u64 {
    self.payload.uint()
  }

  /// Payload float accessor; see [`Payload::float`].
  pub fn float(&self) -> f64 {
    self.payload.float()
  }

  /// Payload list accessor; see [`Payload::list`].
  pub fn list(&self) -> Option<&[Payload]> {
    self.payload.list()
  }

  /// Payload map accessor; see [`Payload::map`].
  pub fn map(&self) -> Option<&HashMap<String, Payload>> {
    self.payload.map()
  }
}

impl fmt::Debug for Envelope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Envelope")
      .field("payload", &self.payload)
      .field("settled", &self.promise.is_settled())
      .finish()
  }
}
