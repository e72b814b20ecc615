//! Update command document building.
//!
//! The update endpoint accepts small XML command documents: `<add>` with
//! one `<doc>` of named fields, `<delete>` with record ids, and the bare
//! `<commit/>` / `<optimize/>` commands.

/// The commit command body.
pub const COMMIT: &str = "<commit/>";

/// The optimize command body.
pub const OPTIMIZE: &str = "<optimize/>";

/// Escapes text for use as XML element content or attribute value.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

/// Builds an `<add>` document for one record.
///
/// Fields are emitted in the given order; a multi-valued field emits one
/// `<field>` element per value, and empty values are skipped entirely.
pub fn save_xml(fields: &[(String, Vec<String>)]) -> String {
    let mut body = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<add><doc>");
    for (name, values) in fields {
        for value in values {
            if value.is_empty() {
                continue;
            }
            body.push_str(&format!(
                "<field name=\"{}\">{}</field>",
                escape(name),
                escape(value)
            ));
        }
    }
    body.push_str("</doc></add>");
    body
}

/// Builds a `<delete>` document for a list of record ids.
pub fn delete_xml(ids: &[String]) -> String {
    let mut body = String::from("<delete>");
    for id in ids {
        body.push_str(&format!("<id>{}</id>", escape(id)));
    }
    body.push_str("</delete>");
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, values: &[&str]) -> (String, Vec<String>) {
        (
            name.to_string(),
            values.iter().map(|v| (*v).to_string()).collect(),
        )
    }

    #[test]
    fn save_escapes_content() {
        let xml = save_xml(&[field("title", &["Cats & Dogs <vol. 1>"])]);
        assert!(xml.contains("<field name=\"title\">Cats &amp; Dogs &lt;vol. 1&gt;</field>"));
    }

    #[test]
    fn save_skips_empty_values() {
        let xml = save_xml(&[field("title", &[""]), field("author", &["smith"])]);
        assert!(!xml.contains("name=\"title\""));
        assert!(xml.contains("name=\"author\""));
    }

    #[test]
    fn save_repeats_multivalued_fields() {
        let xml = save_xml(&[field("topic", &["cats", "dogs"])]);
        assert!(xml.contains("<field name=\"topic\">cats</field><field name=\"topic\">dogs</field>"));
    }

    #[test]
    fn delete_lists_ids() {
        let xml = delete_xml(&["a1".to_string(), "b\"2".to_string()]);
        assert_eq!(xml, "<delete><id>a1</id><id>b&quot;2</id></delete>");
    }
}
