//! Attribute references and their resolution to platform path syntax.
//!
//! References come in three namespaces: contact-scoped custom attributes,
//! platform system attributes, and the result attributes of the last external
//! function call. Text parameters may embed references as `${namespace.key}`
//! placeholders, e.g. `"Hello ${contact.firstName}"`, which resolve to the
//! literal path (`"Hello $.Attributes.firstName"`).

use crate::error::BuildError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    Contact,
    System,
    External,
}

impl Namespace {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "contact" | "attributes" => Some(Namespace::Contact),
            "system" => Some(Namespace::System),
            "external" => Some(Namespace::External),
            _ => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Namespace::Contact => "contact",
            Namespace::System => "system",
            Namespace::External => "external",
        };
        f.write_str(name)
    }
}

/// A symbolic pointer into one of the attribute namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeReference {
    pub namespace: Namespace,
    pub key: String,
}

impl AttributeReference {
    pub fn contact(key: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::Contact,
            key: key.into(),
        }
    }

    pub fn system(key: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::System,
            key: key.into(),
        }
    }

    pub fn external(key: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::External,
            key: key.into(),
        }
    }

    /// Parses the `namespace.key` form used inside placeholders.
    pub fn parse(reference: &str) -> Option<Self> {
        let (namespace, key) = reference.split_once('.')?;
        let namespace = Namespace::parse(namespace.trim())?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self {
            namespace,
            key: key.to_string(),
        })
    }
}

impl fmt::Display for AttributeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}.{}}}", self.namespace, self.key)
    }
}

/// Prefix and key policy for one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRule {
    pub prefix: String,
    /// `None` accepts any key.
    #[serde(default)]
    pub allowed_keys: Option<BTreeSet<String>>,
}

impl NamespaceRule {
    fn open(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            allowed_keys: None,
        }
    }

    fn accepts(&self, key: &str) -> bool {
        self.allowed_keys
            .as_ref()
            .is_none_or(|keys| keys.contains(key))
    }
}

/// The read-only table the resolver consults. One snapshot can be shared by
/// any number of concurrent builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceTable {
    pub contact: NamespaceRule,
    pub system: NamespaceRule,
    pub external: NamespaceRule,
}

impl Default for NamespaceTable {
    fn default() -> Self {
        let system_keys = [
            "Channel",
            "ContactId",
            "InitialContactId",
            "PreviousContactId",
            "InitiationMethod",
            "Name",
            "Description",
            "CustomerEndpoint.Address",
            "CustomerEndpoint.Type",
            "SystemEndpoint.Address",
            "SystemEndpoint.Type",
            "Queue.Name",
            "Queue.ARN",
            "Queue.OutboundCallerId.Address",
            "StoredCustomerInput",
            "Lex.IntentName",
            "Lex.IntentConfidence",
            "LanguageCode",
            "TextToSpeechVoice",
        ];
        Self {
            contact: NamespaceRule::open("$.Attributes."),
            system: NamespaceRule {
                prefix: "$.".to_string(),
                allowed_keys: Some(system_keys.iter().map(|k| k.to_string()).collect()),
            },
            external: NamespaceRule::open("$.External."),
        }
    }
}

impl NamespaceTable {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn rule(&self, namespace: Namespace) -> &NamespaceRule {
        match namespace {
            Namespace::Contact => &self.contact,
            Namespace::System => &self.system,
            Namespace::External => &self.external,
        }
    }

    /// Resolves a reference to its literal path.
    pub fn resolve(&self, reference: &AttributeReference) -> Result<String, BuildError> {
        let rule = self.rule(reference.namespace);
        if !rule.accepts(&reference.key) {
            return Err(BuildError::UnknownAttribute {
                namespace: reference.namespace,
                key: reference.key.clone(),
            });
        }
        Ok(format!("{}{}", rule.prefix, reference.key))
    }

    /// Replaces every `${namespace.key}` placeholder in `text` with its path.
    /// `$$` escapes a literal dollar sign.
    pub fn expand(&self, text: &str) -> Result<String, BuildError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find('$') {
            out.push_str(&rest[..start]);
            let tail = &rest[start + 1..];
            if let Some(after) = tail.strip_prefix('$') {
                out.push('$');
                rest = after;
            } else if let Some(body) = tail.strip_prefix('{') {
                let end = body
                    .find('}')
                    .ok_or_else(|| BuildError::MalformedTemplate(text.to_string()))?;
                let reference = AttributeReference::parse(&body[..end])
                    .ok_or_else(|| BuildError::MalformedTemplate(text.to_string()))?;
                out.push_str(&self.resolve(&reference)?);
                rest = &body[end + 1..];
            } else {
                out.push('$');
                rest = tail;
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_each_namespace() {
        let table = NamespaceTable::default();
        assert_eq!(
            table.resolve(&AttributeReference::contact("tier")).unwrap(),
            "$.Attributes.tier"
        );
        assert_eq!(
            table.resolve(&AttributeReference::system("Channel")).unwrap(),
            "$.Channel"
        );
        assert_eq!(
            table.resolve(&AttributeReference::external("balance")).unwrap(),
            "$.External.balance"
        );
    }

    #[test]
    fn rejects_undeclared_system_key() {
        let table = NamespaceTable::default();
        let err = table
            .resolve(&AttributeReference::system("Nope"))
            .unwrap_err();
        assert!(matches!(err, BuildError::UnknownAttribute { namespace: Namespace::System, .. }));
    }

    #[test]
    fn expands_placeholders_and_escapes() {
        let table = NamespaceTable::default();
        let text = table
            .expand("Hi ${contact.name}, you owe $$${external.due} on ${system.Channel}")
            .unwrap();
        assert_eq!(
            text,
            "Hi $.Attributes.name, you owe $$.External.due on $.Channel"
        );
        assert_eq!(table.expand("plain $5").unwrap(), "plain $5");
    }

    #[test]
    fn malformed_placeholders_fail() {
        let table = NamespaceTable::default();
        assert!(matches!(
            table.expand("Hi ${contact.name"),
            Err(BuildError::MalformedTemplate(_))
        ));
        assert!(matches!(
            table.expand("Hi ${bogus.name}"),
            Err(BuildError::MalformedTemplate(_))
        ));
    }

    #[test]
    fn reference_displays_as_placeholder() {
        let reference = AttributeReference::contact("tier");
        assert_eq!(reference.to_string(), "${contact.tier}");
        assert_eq!(AttributeReference::parse("contact.tier"), Some(reference));
    }
}
