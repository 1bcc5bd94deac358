use crate::{db::predicate::FilterNode, value::Value};
use sha2::{Digest, Sha256};

/// SHA-256 digest of a canonical, order-preserving encoding of the tree.
#[must_use]
pub fn fingerprint(node: &FilterNode) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hash_node(&mut hasher, node);

    hasher.finalize().into()
}

fn hash_node(hasher: &mut Sha256, node: &FilterNode) {
    match node {
        FilterNode::And(children) => {
            write_tag(hasher, 0x23);
            write_len(hasher, children.len());
            for child in children {
                hash_node(hasher, child);
            }
        }
        FilterNode::Or(children) => {
            write_tag(hasher, 0x24);
            write_len(hasher, children.len());
            for child in children {
                hash_node(hasher, child);
            }
        }
        FilterNode::Not(inner) => {
            write_tag(hasher, 0x25);
            hash_node(hasher, inner);
        }
        FilterNode::Leaf { path, op, operand } => {
            write_tag(hasher, 0x26);
            write_str(hasher, path);
            write_tag(hasher, op.tag());
            write_value(hasher, operand);
        }
    }
}

fn write_value(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Null => write_tag(hasher, 0x40),
        Value::Bool(b) => {
            write_tag(hasher, 0x41);
            hasher.update([u8::from(*b)]);
        }
        Value::Int(i) => {
            write_tag(hasher, 0x42);
            hasher.update(i.to_be_bytes());
        }
        Value::Float(f) => {
            write_tag(hasher, 0x43);
            hasher.update(f.to_bits().to_be_bytes());
        }
        Value::Text(s) => {
            write_tag(hasher, 0x44);
            write_str(hasher, s);
        }
        Value::Json(json) => {
            write_tag(hasher, 0x45);
            write_str(hasher, &json.to_string());
        }
        Value::List(items) => {
            write_tag(hasher, 0x46);
            write_len(hasher, items.len());
            for item in items {
                write_value(hasher, item);
            }
        }
        Value::Ref(id) => {
            write_tag(hasher, 0x47);
            write_str(hasher, id);
        }
        Value::Doc(document) => {
            write_tag(hasher, 0x48);
            write_str(hasher, document.doc_type());
            write_str(hasher, document.id());
        }
        Value::Variant(variant) => {
            write_tag(hasher, 0x49);
            write_str(hasher, &variant.tag);
            write_value(hasher, &variant.value);
        }
    }
}

///
/// Encode one string with length prefix into the hash stream.
///

fn write_str(hasher: &mut Sha256, value: &str) {
    write_len(hasher, value.len());
    hasher.update(value.as_bytes());
}

/// Encode a platform-sized length as u64; lossless on every supported target.
fn write_len(hasher: &mut Sha256, len: usize) {
    let len = u64::try_from(len).unwrap_or(u64::MAX);
    hasher.update(len.to_be_bytes());
}

fn write_tag(hasher: &mut Sha256, tag: u8) {
    hasher.update([tag]);
}
