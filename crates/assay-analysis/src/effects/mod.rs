//! Classified effect catalogue: the observable effects of each function,
//! as produced by the effect-detection and classification collaborators.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use assay_core::errors::CatalogueError;
use assay_core::types::collections::FxHashSet;

/// Category of an observable effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectKind {
    ReturnValue,
    ErrorReturn,
    SentinelError,
    ReceiverMutation,
    PointerArgMutation,
    SliceMutation,
    MapMutation,
    GlobalMutation,
    ChannelSend,
    ChannelClose,
    WriterOutput,
    #[serde(rename = "HTTPResponseWrite", alias = "HttpResponseWrite")]
    HttpResponseWrite,
    FileSystemWrite,
    DatabaseWrite,
    GoroutineSpawn,
    Panic,
    CallbackInvocation,
    ContextCancellation,
    LogWrite,
    MetricEmission,
    TimeDependency,
    #[serde(other)]
    Other,
}

/// Priority tier of an effect category, P0 first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    P0,
    P1,
    P2,
    P3,
    P4,
}

impl EffectKind {
    pub fn tier(self) -> Tier {
        match self {
            Self::ReturnValue
            | Self::ErrorReturn
            | Self::SentinelError
            | Self::ReceiverMutation
            | Self::PointerArgMutation => Tier::P0,
            Self::SliceMutation
            | Self::MapMutation
            | Self::GlobalMutation
            | Self::WriterOutput
            | Self::HttpResponseWrite
            | Self::ChannelSend
            | Self::ChannelClose => Tier::P1,
            Self::FileSystemWrite
            | Self::DatabaseWrite
            | Self::GoroutineSpawn
            | Self::Panic
            | Self::CallbackInvocation
            | Self::ContextCancellation => Tier::P2,
            Self::LogWrite | Self::MetricEmission | Self::TimeDependency => Tier::P3,
            Self::Other => Tier::P4,
        }
    }

    /// Effects delivered through the call's results.
    pub fn is_return_kind(self) -> bool {
        matches!(self, Self::ReturnValue | Self::ErrorReturn | Self::SentinelError)
    }

    pub fn is_error_kind(self) -> bool {
        matches!(self, Self::ErrorReturn | Self::SentinelError)
    }

    /// Effects delivered by mutating a value the caller holds.
    pub fn is_mutation_kind(self) -> bool {
        matches!(
            self,
            Self::ReceiverMutation | Self::PointerArgMutation | Self::SliceMutation | Self::MapMutation
        )
    }

    pub fn is_receiver_mutation(self) -> bool {
        self == Self::ReceiverMutation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationLabel {
    Contractual,
    Incidental,
    Ambiguous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: ClassificationLabel,
    #[serde(default)]
    pub confidence: u8,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideEffect {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EffectKind,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    /// Named thing the effect acts on: a parameter, field, or variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

impl SideEffect {
    pub fn label(&self) -> Option<ClassificationLabel> {
        self.classification.as_ref().map(|c| c.label)
    }

    pub fn is_contractual(&self) -> bool {
        self.label() == Some(ClassificationLabel::Contractual)
    }

    pub fn is_incidental(&self) -> bool {
        self.label() == Some(ClassificationLabel::Incidental)
    }

    pub fn is_ambiguous(&self) -> bool {
        self.label() == Some(ClassificationLabel::Ambiguous)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogueTarget {
    qualified_name: String,
}

#[derive(Debug, Deserialize)]
struct CatalogueEntry {
    target: CatalogueTarget,
    #[serde(default)]
    side_effects: Vec<SideEffect>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogueDocument {
    Map {
        functions: BTreeMap<String, Vec<SideEffect>>,
    },
    List(Vec<CatalogueEntry>),
}

/// Qualified function name to its ordered, classified effects.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EffectCatalogue {
    functions: BTreeMap<String, Vec<SideEffect>>,
}

impl EffectCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse either `{"functions": {...}}` or a list of
    /// `{"target": {"qualified_name": ...}, "side_effects": [...]}`.
    pub fn from_json(json: &str) -> Result<Self, CatalogueError> {
        let document: CatalogueDocument =
            serde_json::from_str(json).map_err(|e| CatalogueError::InvalidJson(e.to_string()))?;
        let mut catalogue = Self::new();
        match document {
            CatalogueDocument::Map { functions } => {
                for (name, effects) in functions {
                    catalogue.insert(&name, effects)?;
                }
            }
            CatalogueDocument::List(entries) => {
                for entry in entries {
                    catalogue.insert(&entry.target.qualified_name, entry.side_effects)?;
                }
            }
        }
        Ok(catalogue)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogueError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogueError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Add (or extend) a function's effects. Effect ids must be unique per
    /// function.
    pub fn insert(&mut self, function: &str, effects: Vec<SideEffect>) -> Result<(), CatalogueError> {
        let list = self.functions.entry(function.to_string()).or_default();
        let mut seen: FxHashSet<String> = list.iter().map(|e| e.id.clone()).collect();
        for effect in effects {
            if !seen.insert(effect.id.clone()) {
                return Err(CatalogueError::DuplicateEffectId {
                    id: effect.id,
                    function: function.to_string(),
                });
            }
            list.push(effect);
        }
        Ok(())
    }

    pub fn effects_for(&self, function: &str) -> Option<&[SideEffect]> {
        self.functions.get(function).map(Vec::as_slice)
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_kind_deserializes_to_other() {
        let effect: SideEffect =
            serde_json::from_str(r#"{"id": "e1", "type": "QuantumEntanglement"}"#).unwrap();
        assert_eq!(effect.kind, EffectKind::Other);
        assert_eq!(effect.kind.tier(), Tier::P4);
        assert!(effect.label().is_none());
    }

    #[test]
    fn test_kind_predicates() {
        assert!(EffectKind::ErrorReturn.is_return_kind());
        assert!(EffectKind::PointerArgMutation.is_mutation_kind());
        assert!(!EffectKind::LogWrite.is_mutation_kind());
        assert_eq!(EffectKind::LogWrite.tier(), Tier::P3);
    }
}
