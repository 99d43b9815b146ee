//! Commands, bound parameters and the per-query command initializers.

use std::fmt;

use crate::value::Value;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CommandKind {
    /// Literal query text.
    #[default]
    Text,
    /// A named stored routine.
    StoredProcedure,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Text => f.write_str("text"),
            CommandKind::StoredProcedure => f.write_str("stored procedure"),
        }
    }
}

/// A named parameter value, copied verbatim onto every command a query builds.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A command ready to be handed to a connection. Built fresh for every execution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Command {
    pub text: String,
    pub kind: CommandKind,
    pub parameters: Vec<Parameter>,
}

impl Command {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Sets the text and kind of a fresh command.
pub trait CommandInit {
    fn init_command(&self, command: &mut Command);
}

/// Literal query text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSql(pub String);

impl CommandInit for RawSql {
    fn init_command(&self, command: &mut Command) {
        command.text.clone_from(&self.0);
    }
}

/// Name of a stored routine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredProcedure(pub String);

impl CommandInit for StoredProcedure {
    fn init_command(&self, command: &mut Command) {
        command.text.clone_from(&self.0);
        command.kind = CommandKind::StoredProcedure;
    }
}

/// Build a `Vec<Parameter>` from `name => value` pairs.
///
/// ```
/// use rowmap_core::params;
///
/// let params = params! { "id" => 5, "name" => "ada" };
/// assert_eq!(params.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::command::Parameter>::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {
        ::std::vec![$($crate::command::Parameter::new($name, $value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initializers() {
        let mut command = Command::new();
        RawSql("SELECT 1".into()).init_command(&mut command);
        assert_eq!(command.text, "SELECT 1");
        assert_eq!(command.kind, CommandKind::Text);

        let mut command = Command::new();
        StoredProcedure("get_user".into()).init_command(&mut command);
        assert_eq!(command.text, "get_user");
        assert_eq!(command.kind, CommandKind::StoredProcedure);
    }

    #[test]
    fn test_params_macro() {
        let empty = params![];
        assert!(empty.is_empty());

        let command = Command {
            parameters: params! { "id" => 5, "name" => "ada", "gone" => None::<i32> },
            ..Command::default()
        };
        assert_eq!(command.parameter("id").map(|p| &p.value), Some(&Value::I32(5)));
        assert_eq!(command.parameter("gone").map(|p| &p.value), Some(&Value::Null));
        assert!(command.parameter("missing").is_none());
    }
}
