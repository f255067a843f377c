//! Content-type specific serialization of structured request bodies.
//!
//! Signers that accept a structured body (S3, CloudFront, Route53, Support)
//! turn it into bytes here, picking the format from the request's
//! `content-type`:
//!
//! - `*json*` - compact JSON
//! - `*xml*` - an XML document: object keys become elements, arrays repeat
//!   their element, keys starting with `@` become attributes
//! - `application/x-www-form-urlencoded` - the flattened parameter form

use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::params::flatten_value;

/// Prefix marking an object key as an XML attribute.
pub const XML_ATTRIBUTE_PREFIX: char = '@';

/// Serialize `tree` according to `content_type`.
///
/// # Examples
///
/// ```
/// use rustack_client_core::content::contentify;
/// use serde_json::json;
///
/// let body = contentify(&json!({"a": 1}), "application/x-amz-json-1.1").unwrap();
/// assert_eq!(body, br#"{"a":1}"#);
/// ```
pub fn contentify(tree: &Value, content_type: &str) -> CoreResult<Vec<u8>> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if mime.contains("json") {
        serde_json::to_vec(tree).map_err(|e| serialization_error(content_type, &e))
    } else if mime.contains("xml") {
        to_xml(tree).map_err(|e| serialization_error(content_type, &e))
    } else if mime == "application/x-www-form-urlencoded" {
        let flat = flatten_value(tree);
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(flat.iter())
            .finish();
        Ok(encoded.into_bytes())
    } else {
        Err(CoreError::Serialization {
            content_type: content_type.to_owned(),
            reason: "no serializer for this content type".to_owned(),
        })
    }
}

fn serialization_error(content_type: &str, err: &dyn std::fmt::Display) -> CoreError {
    CoreError::Serialization {
        content_type: content_type.to_owned(),
        reason: err.to_string(),
    }
}

/// Render a JSON tree as an XML document.
///
/// The top-level value must be an object; each of its entries becomes a root
/// level element (normally there is exactly one).
pub fn to_xml(tree: &Value) -> io::Result<Vec<u8>> {
    let Value::Object(map) = tree else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "XML body must be an object",
        ));
    };

    let mut buf = Vec::with_capacity(256);
    let mut writer = Writer::new(&mut buf);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    for (name, value) in map {
        write_node(&mut writer, name, value)?;
    }
    Ok(buf)
}

fn write_node<W: Write>(writer: &mut Writer<W>, name: &str, value: &Value) -> io::Result<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                write_node(writer, name, item)?;
            }
        }
        Value::Object(map) => {
            let attributes: Vec<(&str, String)> = map
                .iter()
                .filter_map(|(k, v)| {
                    k.strip_prefix(XML_ATTRIBUTE_PREFIX)
                        .map(|attr| (attr, text_of(v)))
                })
                .collect();
            let children: Vec<(&String, &Value)> = map
                .iter()
                .filter(|(k, _)| !k.starts_with(XML_ATTRIBUTE_PREFIX))
                .collect();

            let mut element = writer.create_element(name);
            for (attr, attr_value) in &attributes {
                element = element.with_attribute((*attr, attr_value.as_str()));
            }
            if children.is_empty() {
                element.write_empty()?;
            } else {
                element.write_inner_content(|w| {
                    for (child, child_value) in children {
                        write_node(w, child, child_value)?;
                    }
                    Ok(())
                })?;
            }
        }
        Value::Null => {
            writer.create_element(name).write_empty()?;
        }
        scalar => {
            writer
                .create_element(name)
                .write_text_content(BytesText::new(&text_of(scalar)))?;
        }
    }
    Ok(())
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_should_serialize_json_for_json_content_types() {
        let body = contentify(&json!({"Key": "v"}), "application/json; charset=utf-8").unwrap();
        assert_eq!(body, br#"{"Key":"v"}"#);
    }

    #[test]
    fn test_should_serialize_xml_with_repeated_elements() {
        let tree = json!({
            "ChangeBatch": {
                "@xmlns": "https://route53.amazonaws.com/doc/2011-05-05/",
                "Comment": "a & b",
                "Change": [{"Action": "CREATE"}, {"Action": "DELETE"}]
            }
        });
        let body = contentify(&tree, "application/xml").unwrap();
        let xml = std::str::from_utf8(&body).expect("valid UTF-8");

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(
            "<ChangeBatch xmlns=\"https://route53.amazonaws.com/doc/2011-05-05/\">"
        ));
        assert!(xml.contains("<Comment>a &amp; b</Comment>"));
        assert!(xml.contains(
            "<Change><Action>CREATE</Action></Change><Change><Action>DELETE</Action></Change>"
        ));
    }

    #[test]
    fn test_should_serialize_form_bodies_from_flattened_params() {
        let body = contentify(
            &json!({"Action": "SendMessage", "Attr": ["a b", "c"]}),
            "application/x-www-form-urlencoded; charset=utf-8",
        )
        .unwrap();
        assert_eq!(body, b"Action=SendMessage&Attr.1=a+b&Attr.2=c");
    }

    #[test]
    fn test_should_reject_unknown_content_types() {
        let result = contentify(&json!({"a": 1}), "binary/octet-stream");
        assert!(matches!(result, Err(CoreError::Serialization { .. })));
    }

    #[test]
    fn test_should_reject_non_object_xml_roots() {
        let result = contentify(&json!(["a"]), "text/xml");
        assert!(matches!(result, Err(CoreError::Serialization { .. })));
    }
}
