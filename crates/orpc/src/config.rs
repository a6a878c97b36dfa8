// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interface definition files.
//!
//! Records and interfaces described in TOML, with parameter types written in
//! the type grammar (`i32`, `string[]`, `*variant`, `Point`, ...).
//!
//! ```toml
//! [[records]]
//! name = "Point"
//! fields = [{ name = "x", type = "i32" }, { name = "y", type = "i32" }]
//!
//! [[interfaces]]
//! name = "IShapes"
//! id = "0x5A"
//! base = "IBase"
//!
//! [[interfaces.methods]]
//! name = "Centroid"
//! params = [
//!     { name = "points", dir = "in", type = "Point[]" },
//!     { name = "center", dir = "out", type = "Point" },
//! ]
//! ```
//!
//! Bases are referenced by name and must appear earlier in the file, as must
//! records used by another record's fields.
//! Interfaces without an `id` get one from an [`IdentityAllocator`].

use crate::error::RegistryError;
use crate::identity::IdentityAllocator;
use crate::types::{
    Direction, FieldDescriptor, InterfaceDescriptor, InterfaceId, MethodDescriptor,
    ParameterDescriptor, RecordDescriptor, TypeDescriptor, TypeStore,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Registration failed: {0}")]
    Registry(#[from] RegistryError),
}

/// Contents of one interface definition file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceFile {
    #[serde(default)]
    pub records: Vec<RecordConfig>,

    #[serde(default)]
    pub interfaces: Vec<InterfaceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordConfig {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub name: String,

    /// UUID text, `0x` hex or decimal. Allocated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Name of the base interface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    #[serde(default)]
    pub methods: Vec<MethodConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodConfig {
    pub name: String,

    #[serde(default)]
    pub params: Vec<ParamConfig>,

    /// Return type, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamConfig {
    pub name: String,
    pub dir: ParamDirection,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
}

/// Parameter direction as written in files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamDirection {
    In,
    Out,
    InOut,
}

impl From<ParamDirection> for Direction {
    fn from(dir: ParamDirection) -> Self {
        match dir {
            ParamDirection::In => Direction::In,
            ParamDirection::Out => Direction::Out,
            ParamDirection::InOut => Direction::InOut,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn parse_type(context: &str, text: &str) -> Result<TypeDescriptor, ConfigError> {
    text.parse()
        .map_err(|e| ConfigError::Invalid(format!("{}: '{}': {}", context, text, e)))
}

impl InterfaceFile {
    /// Load and validate a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: Self = toml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    /// Structural checks that do not need a store: names, directions,
    /// type syntax, ids and base ordering.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut records = HashSet::new();
        for record in &self.records {
            if record.name.is_empty() {
                return Err(ConfigError::Invalid("record with empty name".into()));
            }
            if !records.insert(record.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "record '{}' defined twice",
                    record.name
                )));
            }
            for field in &record.fields {
                let context = format!("record {}.{}", record.name, field.name);
                let ty = parse_type(&context, &field.ty)?;
                self.check_references(&context, &ty, &records)?;
            }
        }

        let mut seen = HashSet::new();
        for iface in &self.interfaces {
            if iface.name.is_empty() {
                return Err(ConfigError::Invalid("interface with empty name".into()));
            }
            if let Some(base) = &iface.base {
                if !seen.contains(base.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "interface {}: base '{}' must be defined earlier",
                        iface.name, base
                    )));
                }
            }
            if !seen.insert(iface.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "interface '{}' defined twice",
                    iface.name
                )));
            }
            if let Some(id) = &iface.id {
                id.parse::<InterfaceId>().map_err(|e| {
                    ConfigError::Invalid(format!("interface {}: {}", iface.name, e))
                })?;
            }
            for method in &iface.methods {
                if method.name.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "interface {}: method with empty name",
                        iface.name
                    )));
                }
                let context = format!("{}::{}", iface.name, method.name);
                for param in &method.params {
                    let context = format!("{}({})", context, param.name);
                    let ty = parse_type(&context, &param.ty)?;
                    self.check_references(&context, &ty, &records)?;
                }
                if let Some(ret) = &method.returns {
                    let context = format!("{} return", context);
                    let ty = parse_type(&context, ret)?;
                    self.check_references(&context, &ty, &records)?;
                }
            }
        }
        Ok(())
    }

    /// Every record named by `ty` must already be declared in `known`.
    fn check_references(
        &self,
        context: &str,
        ty: &TypeDescriptor,
        known: &HashSet<&str>,
    ) -> Result<(), ConfigError> {
        for name in ty.named_references() {
            if known.contains(name) {
                continue;
            }
            let reason = if self.records.iter().any(|r| r.name == name) {
                "must be defined before it is used"
            } else {
                "is not defined"
            };
            return Err(ConfigError::Invalid(format!(
                "{}: record '{}' {}",
                context, name, reason
            )));
        }
        Ok(())
    }

    /// Register every record and interface into a fresh store.
    ///
    /// The store is returned unpublished so callers can add more before
    /// calling [`TypeStore::publish`].
    pub fn build_store(&self, ids: &dyn IdentityAllocator) -> Result<TypeStore, ConfigError> {
        self.validate()?;
        let mut store = TypeStore::new();

        for record in &self.records {
            let mut desc = RecordDescriptor::new(&record.name);
            for field in &record.fields {
                let context = format!("record {}.{}", record.name, field.name);
                desc.fields
                    .push(FieldDescriptor::new(&field.name, parse_type(&context, &field.ty)?));
            }
            store.register_record(desc)?;
        }

        let mut by_name: HashMap<&str, InterfaceDescriptor> = HashMap::new();
        for iface in &self.interfaces {
            let id = match &iface.id {
                Some(text) => text
                    .parse::<InterfaceId>()
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?,
                None => ids.allocate(&iface.name),
            };

            let mut builder = InterfaceDescriptor::builder(id, &iface.name);
            if let Some(base) = &iface.base {
                let base = by_name.get(base.as_str()).ok_or_else(|| {
                    ConfigError::Invalid(format!("unknown base '{}'", base))
                })?;
                builder = builder.inherits(base);
            }
            for method in &iface.methods {
                builder = builder.method(method_descriptor(&iface.name, method)?);
            }

            let desc = builder.build();
            store.register(desc.clone())?;
            by_name.insert(iface.name.as_str(), desc);
        }

        log::info!(
            "[config] loaded {} interfaces, {} records",
            store.len(),
            self.records.len()
        );
        Ok(store)
    }

    /// Describe the contents of `store`.
    ///
    /// Records come before the records that use them and bases before
    /// derived interfaces, so the output loads back with [`build_store`].
    ///
    /// [`build_store`]: Self::build_store
    pub fn from_store(store: &TypeStore) -> Self {
        let mut by_name: Vec<&RecordDescriptor> = store.records().collect();
        by_name.sort_by(|a, b| a.name.cmp(&b.name));
        let mut placed = HashSet::new();
        let mut ordered = Vec::with_capacity(by_name.len());
        for record in by_name {
            place_record(store, record, &mut placed, &mut ordered);
        }

        let records = ordered
            .into_iter()
            .map(|r| RecordConfig {
                name: r.name.clone(),
                fields: r
                    .fields
                    .iter()
                    .map(|f| FieldConfig {
                        name: f.name.clone(),
                        ty: f.ty.to_string(),
                    })
                    .collect(),
            })
            .collect();

        let mut ifaces: Vec<&InterfaceDescriptor> = store.interfaces().collect();
        ifaces.sort_by_key(|d| (store.chain(d.id).count(), d.name.clone()));

        let interfaces = ifaces
            .into_iter()
            .map(|d| InterfaceConfig {
                name: d.name.clone(),
                id: Some(d.id.to_string()),
                base: d
                    .base
                    .and_then(|b| store.resolve(b))
                    .map(|b| b.name.clone()),
                methods: d.methods.iter().map(method_config).collect(),
            })
            .collect();

        Self {
            records,
            interfaces,
        }
    }

    /// Serialize as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A small file exercising inheritance, records, arrays and byref.
    pub fn example() -> Self {
        let param = |name: &str, dir: ParamDirection, ty: &str| ParamConfig {
            name: name.into(),
            dir,
            ty: ty.into(),
            optional: false,
        };
        Self {
            records: vec![RecordConfig {
                name: "Point".into(),
                fields: vec![
                    FieldConfig {
                        name: "x".into(),
                        ty: "i32".into(),
                    },
                    FieldConfig {
                        name: "y".into(),
                        ty: "i32".into(),
                    },
                ],
            }],
            interfaces: vec![
                InterfaceConfig {
                    name: "IBase".into(),
                    id: Some("0x100".into()),
                    base: None,
                    methods: vec![MethodConfig {
                        name: "Ping".into(),
                        params: Vec::new(),
                        returns: Some("string".into()),
                    }],
                },
                InterfaceConfig {
                    name: "IShapes".into(),
                    id: Some("0x200".into()),
                    base: Some("IBase".into()),
                    methods: vec![
                        MethodConfig {
                            name: "Centroid".into(),
                            params: vec![
                                param("points", ParamDirection::In, "Point[]"),
                                param("center", ParamDirection::Out, "Point"),
                            ],
                            returns: None,
                        },
                        MethodConfig {
                            name: "Scale".into(),
                            params: vec![
                                param("factor", ParamDirection::InOut, "f64"),
                                ParamConfig {
                                    optional: true,
                                    ..param("label", ParamDirection::In, "string")
                                },
                            ],
                            returns: Some("bool".into()),
                        },
                        MethodConfig {
                            name: "Tag".into(),
                            params: vec![param("value", ParamDirection::In, "*variant")],
                            returns: None,
                        },
                    ],
                },
            ],
        }
    }
}

/// Push `record` after every record it references; self and cyclic
/// references are placed once.
fn place_record<'s>(
    store: &'s TypeStore,
    record: &'s RecordDescriptor,
    placed: &mut HashSet<&'s str>,
    ordered: &mut Vec<&'s RecordDescriptor>,
) {
    if !placed.insert(record.name.as_str()) {
        return;
    }
    for field in &record.fields {
        for name in field.ty.named_references() {
            if let Some(dependency) = store.resolve_record(name) {
                place_record(store, dependency, placed, ordered);
            }
        }
    }
    ordered.push(record);
}

fn method_descriptor(iface: &str, method: &MethodConfig) -> Result<MethodDescriptor, ConfigError> {
    let context = format!("{}::{}", iface, method.name);
    let mut desc = MethodDescriptor::new(&method.name);
    for param in &method.params {
        let ty = parse_type(&format!("{}({})", context, param.name), &param.ty)?;
        let mut p = ParameterDescriptor::new(&param.name, param.dir.into(), ty);
        if param.optional {
            p = p.optional();
        }
        desc = desc.param(p);
    }
    if let Some(ret) = &method.returns {
        desc = desc.returns(parse_type(&format!("{} return", context), ret)?);
    }
    Ok(desc)
}

fn method_config(method: &MethodDescriptor) -> MethodConfig {
    let params = method
        .parameters
        .iter()
        .filter_map(|p| {
            let dir = match p.direction {
                Direction::In => ParamDirection::In,
                Direction::Out => ParamDirection::Out,
                Direction::InOut => ParamDirection::InOut,
                Direction::Return => return None,
            };
            Some(ParamConfig {
                name: p.name.clone(),
                dir,
                ty: p.ty.to_string(),
                optional: p.optional,
            })
        })
        .collect();
    MethodConfig {
        name: method.name.clone(),
        params,
        returns: method.return_param().map(|p| p.ty.to_string()),
    }
}
