use serde_json::Value;

/// A status report: `{"type":"status","device":…,"status":…}`.
///
/// `command` keeps any truthy command member riding on the same frame, so a
/// status report that also carries a command is still forwarded as one.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub device: String,
    pub status: String,
    pub command: Option<Value>,
}

/// Classification of one inbound JSON frame.
///
/// The bus accepts any JSON whatsoever; only two shapes mean anything to the
/// relay itself, and everything else passes through untouched as `Opaque`.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// A device status report, applied to the registry before fan-out.
    Status(StatusReport),
    /// Any other object whose `command` member is truthy; re-broadcast as a
    /// bare `{"command": …}` frame in addition to the raw one.
    Command { command: Value },
    /// Anything else, arrays and scalars included. Broadcast verbatim.
    Opaque(Value),
}

impl Envelope {
    /// Parse and classify a text frame. Non-JSON input is the caller's
    /// per-message failure; the connection itself is unaffected.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        Ok(Self::classify(serde_json::from_str(text)?))
    }

    /// Classify an already-parsed value.
    ///
    /// Field probing mirrors the original wire protocol: the `type` tag only
    /// counts when `device` and `status` are both strings, and `command`
    /// only counts when truthy under JavaScript rules.
    pub fn classify(value: Value) -> Self {
        let fields = match value.as_object() {
            Some(fields) => fields,
            None => return Envelope::Opaque(value),
        };

        if fields.get("type").and_then(Value::as_str) == Some("status") {
            if let (Some(device), Some(status)) = (
                fields.get("device").and_then(Value::as_str),
                fields.get("status").and_then(Value::as_str),
            ) {
                let command = fields.get("command").filter(|c| is_truthy(c)).cloned();
                return Envelope::Status(StatusReport {
                    device: device.to_string(),
                    status: status.to_string(),
                    command,
                });
            }
        }

        let command = fields.get("command").filter(|c| is_truthy(c)).cloned();
        match command {
            Some(command) => Envelope::Command { command },
            None => Envelope::Opaque(value),
        }
    }

    /// The command payload to forward, whichever variant carries it.
    pub fn command(&self) -> Option<&Value> {
        match self {
            Envelope::Status(report) => report.command.as_ref(),
            Envelope::Command { command } => Some(command),
            Envelope::Opaque(_) => None,
        }
    }
}

/// JavaScript truthiness for a JSON value: `null`, `false`, `0` and `""`
/// are falsy; arrays and objects are always truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
