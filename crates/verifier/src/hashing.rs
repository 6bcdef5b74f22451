//! Program fingerprints.
//!
//! A fingerprint is the blake3 hash of the instruction words and every
//! pool, in a length-prefixed little-endian encoding. Two compilations
//! have the same fingerprint exactly when they produced equal programs.

use celvm_common::{Program, Span, Value};

/// Compute the 256-bit fingerprint of a program.
pub fn fingerprint(program: &Program) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();

    hasher.update(&program.register_count.to_le_bytes());
    write_len(&mut hasher, program.instructions.len());
    for word in &program.instructions {
        hasher.update(&word.to_le_bytes());
    }

    write_len(&mut hasher, program.constants.len());
    for constant in &program.constants {
        write_value(&mut hasher, constant);
    }

    write_len(&mut hasher, program.strings.len());
    for s in &program.strings {
        write_bytes(&mut hasher, s.as_bytes());
    }

    write_len(&mut hasher, program.spans.len());
    for Span { start, end } in &program.spans {
        write_len(&mut hasher, *start);
        write_len(&mut hasher, *end);
    }

    write_len(&mut hasher, program.message_fields.len());
    for names in &program.message_fields {
        write_len(&mut hasher, names.len());
        for name in names {
            write_bytes(&mut hasher, name.as_bytes());
        }
    }

    *hasher.finalize().as_bytes()
}

/// First six bytes of the fingerprint as lowercase hex, for logs and
/// listings.
pub fn short_fingerprint(program: &Program) -> String {
    fingerprint(program)[..6]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn write_len(hasher: &mut blake3::Hasher, len: usize) {
    hasher.update(&(len as u64).to_le_bytes());
}

fn write_bytes(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    write_len(hasher, bytes.len());
    hasher.update(bytes);
}

fn write_value(hasher: &mut blake3::Hasher, value: &Value) {
    hasher.update(&[value.kind().index() as u8]);
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            hasher.update(&[u8::from(*b)]);
        }
        Value::Int(i) => {
            hasher.update(&i.to_le_bytes());
        }
        Value::UInt(u) => {
            hasher.update(&u.to_le_bytes());
        }
        Value::Double(d) => {
            hasher.update(&d.to_bits().to_le_bytes());
        }
        Value::String(s) => write_bytes(hasher, s.as_bytes()),
        Value::Bytes(b) => write_bytes(hasher, b),
        Value::List(items) => {
            write_len(hasher, items.len());
            for item in items {
                write_value(hasher, item);
            }
        }
        Value::Map(map) => {
            write_len(hasher, map.len());
            for (key, item) in map {
                write_value(hasher, &key.to_value());
                write_value(hasher, item);
            }
        }
        Value::Message(msg) => {
            write_bytes(hasher, msg.type_name.as_bytes());
            write_len(hasher, msg.fields.len());
            for (name, item) in &msg.fields {
                write_bytes(hasher, name.as_bytes());
                write_value(hasher, item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program_with(constants: Vec<Value>) -> Program {
        Program {
            constants,
            register_count: 1,
            ..Program::default()
        }
    }

    #[test]
    fn equal_programs_share_fingerprint() {
        let a = program_with(vec![Value::Int(1), Value::from("x")]);
        assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
    }

    #[test]
    fn constant_kind_changes_fingerprint() {
        let a = program_with(vec![Value::Int(1)]);
        let b = program_with(vec![Value::UInt(1)]);
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn pool_boundaries_are_unambiguous() {
        let a = Program {
            strings: vec!["ab".into(), "c".into()],
            ..Program::default()
        };
        let b = Program {
            strings: vec!["a".into(), "bc".into()],
            ..Program::default()
        };
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn short_form_is_twelve_hex_digits() {
        let s = short_fingerprint(&Program::default());
        assert_eq!(s.len(), 12);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
