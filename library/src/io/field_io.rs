//! Reading and writing fields.
//!
//! Text form, one field per line:
//!
//! ```text
//! <name> [<value>] [~] [= <container>.<master>]
//! ```
//!
//! The value is omitted for default fields, `~` marks an ignored field and the
//! `=` clause names the upstream container and its field or output. Binary
//! form is the name, the value, a [`FileFlags`] word and, if the connected bit
//! is set, the container and master names.

use log::warn;

use crate::error::FieldError;
use crate::graph::FieldGraph;
use crate::io::{FileFlags, Input, Output};
use crate::model::{ContainerId, FieldId, StatusFlags};

impl FieldGraph {
    /// Text output configured with this graph's indent width.
    pub fn text_output(&self) -> Output {
        Output::text().with_indent_width(self.config.indent_width)
    }

    /// Writes `field` under `name`. Dirty fields are evaluated first.
    pub fn write_field(&mut self, field: FieldId, name: &str, out: &mut Output) -> Result<(), FieldError> {
        self.check_field(field)?;
        self.evaluate(field);
        let connection = self.resolve_write_connection(field);
        let record = self.record(field);

        out.indent();
        out.write_name(name);

        if out.is_binary() {
            record.value.write_value(out);
            let mut flags = FileFlags::empty();
            flags.set(FileFlags::IGNORED, record.flags.contains(StatusFlags::IGNORED));
            flags.set(FileFlags::DEFAULT, record.flags.contains(StatusFlags::DEFAULT));
            flags.set(FileFlags::CONNECTED, connection.is_some());
            out.write_u32(flags.bits());
            if let Some((container, master)) = &connection {
                out.write_name(container);
                out.write_name(master);
            }
            return Ok(());
        }

        if !record.flags.contains(StatusFlags::DEFAULT) {
            out.write_char(' ');
            record.value.write_value(out);
        }
        if record.flags.contains(StatusFlags::IGNORED) {
            out.write_raw(" ~");
        }
        if let Some((container, master)) = &connection {
            out.write_raw(" = ");
            out.write_name(container);
            out.write_char('.');
            out.write_name(master);
        }
        out.write_char('\n');
        Ok(())
    }

    /// Names of the upstream container and master to write for a connected
    /// field.
    ///
    /// Connections are resolved by container name on read-back, so the
    /// upstream container must be named. This holds for engines too: a
    /// connection to an unnamed engine or node is dropped with a warning. A
    /// named container is referenced whether or not its own fields are
    /// written; making it readable is up to the caller.
    pub fn resolve_write_connection(&self, field: FieldId) -> Option<(String, String)> {
        if !self.is_connected(field) {
            return None;
        }
        let Some((container, master)) = self.connection_target(field) else {
            warn!("dropping connection of field {field}: upstream has no container");
            return None;
        };
        match self.container_name(container) {
            Some(name) => Some((name.to_string(), master)),
            None => {
                warn!("dropping connection of field {field}: upstream {container} is not named");
                None
            }
        }
    }

    fn connection_target(&self, field: FieldId) -> Option<(ContainerId, String)> {
        if let Some(master) = self.connected_field(field) {
            return Some((self.container_of(master)?, self.field_name(master)?.to_string()));
        }
        let output = self.connected_engine(field)?;
        Some((self.output_container(output)?, self.output_name(output)?.to_string()))
    }

    /// Reads what follows a field's name.
    ///
    /// The default and dirty flags are cleared before parsing. A parse error
    /// leaves the value untouched; the flags stay cleared unless
    /// `rollback_flags_on_read_error` is configured. A connection clause
    /// naming a missing container or master is an error, but a connection
    /// that cannot be made (no converter) is only logged.
    pub fn read_field(&mut self, field: FieldId, input: &mut Input) -> Result<(), FieldError> {
        self.check_field(field)?;
        let tracked = StatusFlags::DEFAULT | StatusFlags::DIRTY;
        let record = self.record_mut(field);
        let saved = record.flags & tracked;
        record.flags.remove(tracked);

        let result = if input.is_binary() {
            self.read_binary_field(field, input)
        } else {
            self.read_text_field(field, input)
        };

        if result.is_err() && self.config.rollback_flags_on_read_error {
            let record = self.record_mut(field);
            record.flags.remove(tracked);
            record.flags.insert(saved);
        }
        result
    }

    fn read_text_field(&mut self, field: FieldId, input: &mut Input) -> Result<(), FieldError> {
        // A bare name at the end of the input is a default field, not a
        // premature end of input.
        if input.eof() {
            self.set_default(field, true);
            return Ok(());
        }

        let c = input.read_char()?;
        if c == '~' {
            // No value token: the field keeps its default value.
            self.set_ignored(field, true);
            self.set_default(field, true);
        } else if c == '=' {
            return self.read_connection(field, input);
        } else {
            input.put_back(c);
            self.read_value_into(field, input)?;
            if input.peek_char() == Some('~') {
                input.read_char()?;
                self.set_ignored(field, true);
            }
        }

        if input.peek_char() == Some('=') {
            input.read_char()?;
            self.read_connection(field, input)?;
        }
        Ok(())
    }

    fn read_binary_field(&mut self, field: FieldId, input: &mut Input) -> Result<(), FieldError> {
        self.read_value_into(field, input)?;
        let word = input.read_u32()?;
        let flags = FileFlags::from_bits_truncate(word);
        let unknown = word & !FileFlags::all().bits();
        if unknown != 0 {
            warn!("field {field}: unknown flag bits {unknown:#x} on line {}", input.line());
        }

        if flags.contains(FileFlags::IGNORED) {
            self.set_ignored(field, true);
        }
        if flags.contains(FileFlags::CONNECTED) {
            self.read_connection(field, input)?;
        }
        if flags.contains(FileFlags::DEFAULT) {
            self.set_default(field, true);
        }
        Ok(())
    }

    /// Parses into a scratch copy so a failed read keeps the old value.
    fn read_value_into(&mut self, field: FieldId, input: &mut Input) -> Result<(), FieldError> {
        let mut scratch = self.record(field).value.clone_value();
        scratch.read_value(input)?;
        self.record_mut(field).value = scratch;
        self.value_changed(field, true);
        Ok(())
    }

    fn read_connection(&mut self, field: FieldId, input: &mut Input) -> Result<(), FieldError> {
        let container_name = input.read_name()?;
        if !input.is_binary() {
            let c = input.read_char()?;
            if c != '.' {
                return Err(input.error(format!("expected '.' after \"{container_name}\", got '{c}'")));
            }
        }
        let master_name = input.read_name()?;

        let container = self
            .container_by_name(&container_name)
            .ok_or_else(|| FieldError::UnknownContainer(container_name.clone()))?;
        let result = if let Some(master) = self.field_by_name(container, &master_name) {
            self.connect_from(field, master, false, false)
        } else if let Some(output) = self.output_by_name(container, &master_name) {
            self.connect_from_output(field, output, false, false)
        } else {
            return Err(FieldError::NoSuchField {
                container: container_name,
                name: master_name,
            });
        };

        if let Err(err) = result {
            warn!("field {field} not connected to {container_name}.{master_name}: {err}");
        }
        Ok(())
    }

    /// Parses `text` as the field's value and runs a value-changed pass.
    pub fn set_from_str(&mut self, field: FieldId, text: &str) -> Result<(), FieldError> {
        self.check_field(field)?;
        let mut input = Input::from_text(text);
        self.read_value_into(field, &mut input)
    }

    /// Text form of the field's current value.
    pub fn get_as_string(&mut self, field: FieldId) -> Option<String> {
        let value = self.value(field)?;
        let mut out = Output::text();
        value.write_value(&mut out);
        Some(out.as_text())
    }

    /// Writes every field of `container` that carries information.
    pub fn write_container_fields(&mut self, container: ContainerId, out: &mut Output) -> Result<(), FieldError> {
        let fields = self
            .containers
            .get(&container)
            .map(|c| c.fields.clone())
            .ok_or_else(|| FieldError::invalid_argument(format!("unknown container {container}")))?;
        for (name, field) in fields {
            if self.should_write(field) {
                self.write_field(field, &name, out)?;
            }
        }
        Ok(())
    }

    /// Reads `name value ...` entries into the fields of `container` until the
    /// input is exhausted.
    pub fn read_container_fields(&mut self, container: ContainerId, input: &mut Input) -> Result<(), FieldError> {
        if !self.has_container(container) {
            return Err(FieldError::invalid_argument(format!("unknown container {container}")));
        }
        while !input.eof() {
            let name = input.read_name()?;
            let Some(field) = self.field_by_name(container, &name) else {
                let container = self
                    .container_name(container)
                    .or_else(|| self.container_type_name(container))
                    .unwrap_or_default()
                    .to_string();
                return Err(FieldError::NoSuchField { container, name });
            };
            self.read_field(field, input)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{FloatValue, Int32Value};
    use crate::plugin::ConverterRegistry;

    #[test]
    fn test_set_from_str_and_get_as_string() {
        let mut graph = FieldGraph::new(Arc::new(ConverterRegistry::new()));
        let field = graph.create_field(FloatValue::default());
        graph.set_from_str(field, "2.5").unwrap();
        assert_eq!(graph.get_as_string(field).as_deref(), Some("2.5"));
        assert!(!graph.is_default(field));

        assert!(graph.set_from_str(field, "oops").is_err());
        assert_eq!(graph.get::<f32>(field), Some(2.5));
    }

    #[test]
    fn test_text_value_and_ignored_marker() {
        let mut graph = FieldGraph::new(Arc::new(ConverterRegistry::new()));
        let node = graph.create_node("Counter", None);
        let count = graph.add_field(node, "count", Int32Value::from(0)).unwrap();
        graph.set(count, 3).unwrap();
        graph.set_ignored(count, true);

        let mut out = graph.text_output();
        graph.write_field(count, "count", &mut out).unwrap();
        assert_eq!(out.as_text(), "count 3 ~\n");
    }

    #[test]
    fn test_read_ignored_without_value() {
        let mut graph = FieldGraph::new(Arc::new(ConverterRegistry::new()));
        let field = graph.create_field(Int32Value::from(4));
        graph.read_field(field, &mut Input::from_text("~")).unwrap();
        assert!(graph.is_ignored(field));
        assert_eq!(graph.get::<i32>(field), Some(4));
        assert!(graph.is_default(field));
    }
}
