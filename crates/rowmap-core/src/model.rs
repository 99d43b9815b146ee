use smol_str::SmolStr;
use std::fmt;

use crate::error::Result;
use crate::options::MapOptions;
use crate::shape::{FromValue, TargetKind};
use crate::value::Value;

type Setter<T> = Box<dyn Fn(&mut T, Value, &MapOptions) -> Result<()> + Send + Sync>;

/// Field metadata produced by the derive macro.
pub struct FieldModel<T> {
    /// Rust field ident
    pub name: &'static str,
    /// Lowercased column name the field binds to
    pub column: SmolStr,
    pub ty_name: &'static str,
    pub kind: TargetKind,
    pub nullable: bool,
    setter: Setter<T>,
}

impl<T: 'static> FieldModel<T> {
    /// Describe a field of `T` holding an `F`.
    ///
    /// A null marker assigns `F::zero()`; anything else goes through
    /// [`FromValue::from_value`].
    pub fn new<F>(name: &'static str, column: &str, assign: fn(&mut T, F)) -> Self
    where
        F: FromValue + 'static,
    {
        Self {
            name,
            column: SmolStr::new(column.to_lowercase()),
            ty_name: std::any::type_name::<F>(),
            kind: F::KIND,
            nullable: F::NULLABLE,
            setter: Box::new(move |target, value, options| {
                let v = if value.is_null() {
                    F::zero()
                } else {
                    F::from_value(value, options)?
                };
                assign(target, v);
                Ok(())
            }),
        }
    }

    /// Re-home this field inside an outer type that embeds `T`.
    pub fn lift<O: 'static>(&'static self, access: fn(&mut O) -> &mut T) -> FieldModel<O> {
        FieldModel {
            name: self.name,
            column: self.column.clone(),
            ty_name: self.ty_name,
            kind: self.kind,
            nullable: self.nullable,
            setter: Box::new(move |outer, value, options| (self.setter)(access(outer), value, options)),
        }
    }

    pub fn assign(&self, target: &mut T, value: Value, options: &MapOptions) -> Result<()> {
        (self.setter)(target, value, options)
    }
}

impl<T> fmt::Debug for FieldModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldModel")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("ty_name", &self.ty_name)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for FieldModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty_name)?;
        if self.nullable {
            write!(f, "?")?;
        }
        write!(f, " @{}", self.column)
    }
}

/// Row model of a composite type: its eligible fields in declaration order.
#[derive(Debug)]
pub struct RowModel<T> {
    /// Rust type name
    pub type_name: &'static str,
    pub fields: Vec<FieldModel<T>>,
}

impl<T: 'static> RowModel<T> {
    pub fn new(type_name: &'static str, fields: Vec<FieldModel<T>>) -> Self {
        Self { type_name, fields }
    }

    /// Lookup a field model by Rust field name.
    pub fn field(&self, name: &str) -> Option<&FieldModel<T>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Lookup a field model by column name, ignoring case.
    pub fn field_for_column(&self, column: &str) -> Option<&FieldModel<T>> {
        let column = column.to_lowercase();
        self.fields.iter().find(|f| f.column == column.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RowMapError;
    use std::sync::OnceLock;

    #[derive(Default, Debug, PartialEq)]
    struct Audit {
        created_by: String,
    }

    #[derive(Default, Debug, PartialEq)]
    struct Player {
        id: i64,
        nickname: Option<String>,
        audit: Audit,
    }

    fn audit_model() -> &'static RowModel<Audit> {
        static MODEL: OnceLock<RowModel<Audit>> = OnceLock::new();
        MODEL.get_or_init(|| {
            RowModel::new(
                "Audit",
                vec![FieldModel::new("created_by", "CreatedBy", |t: &mut Audit, v: String| {
                    t.created_by = v
                })],
            )
        })
    }

    fn audit_of(p: &mut Player) -> &mut Audit {
        &mut p.audit
    }

    fn player_model() -> RowModel<Player> {
        let mut fields = vec![
            FieldModel::new("id", "id", |t: &mut Player, v: i64| t.id = v),
            FieldModel::new("nickname", "Nick", |t: &mut Player, v: Option<String>| {
                t.nickname = v
            }),
        ];
        fields.extend(audit_model().fields.iter().map(|f| f.lift(audit_of)));
        RowModel::new("Player", fields)
    }

    #[test]
    fn test_field_metadata() {
        let model = player_model();
        let nick = model.field("nickname").unwrap();
        assert_eq!(nick.column, "nick");
        assert!(nick.nullable);
        assert_eq!(nick.kind, TargetKind::String);
        assert_eq!(nick.to_string(), format!("nickname: {}? @nick", nick.ty_name));
        assert!(model.field_for_column("CREATEDBY").is_some());
        assert!(model.field("audit").is_none());
    }

    #[test]
    fn test_setters_apply_zero_on_null_and_lift_through_flatten() {
        let model = player_model();
        let options = MapOptions::default();
        let mut player = Player::default();

        model.field("id").unwrap().assign(&mut player, Value::I32(9), &options).unwrap();
        model.field("nickname").unwrap().assign(&mut player, Value::Null, &options).unwrap();
        model
            .field("created_by")
            .unwrap()
            .assign(&mut player, Value::from("ops"), &options)
            .unwrap();

        assert_eq!(
            player,
            Player {
                id: 9,
                nickname: None,
                audit: Audit { created_by: "ops".into() },
            }
        );

        let err = model
            .field("id")
            .unwrap()
            .assign(&mut player, Value::from("nine"), &options)
            .unwrap_err();
        assert!(matches!(err, RowMapError::TypeMismatch { .. }));
    }
}
