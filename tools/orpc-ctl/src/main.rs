// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ORPC control tool
//!
//! Inspects interface definition files and encodes or decodes call frames
//! without a running peer.
//!
//! # Usage
//!
//! ```bash
//! # Write an example interface file
//! orpc-ctl gen-config -o shapes.toml
//!
//! # Check it and print the method tables
//! orpc-ctl validate -c shapes.toml
//! orpc-ctl describe -c shapes.toml -i IShapes
//!
//! # Encode a call, then decode it again
//! orpc-ctl encode-call -c shapes.toml -i IShapes -m Scale --args '[1.5, "x"]'
//! orpc-ctl decode-call -c shapes.toml --hex "00 02 00 00 ..."
//! ```

mod hex;
mod json;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use orpc::config::InterfaceFile;
use orpc::types::{InterfaceDescriptor, TypeStore, VTable};
use orpc::{Marshaler, SequentialIdAllocator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "orpc-ctl")]
#[command(about = "ORPC interface inspection and call-frame encoding")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// High 64 bits of ids allocated to interfaces without an explicit id
    #[arg(long, default_value = "0")]
    id_prefix: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an example interface file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "interfaces.toml")]
        output: PathBuf,
    },

    /// Validate an interface file and register it into a store
    Validate {
        /// Interface file path
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print method tables
    Describe {
        /// Interface file path
        #[arg(short, long)]
        config: PathBuf,

        /// Only this interface
        #[arg(short, long)]
        interface: Option<String>,
    },

    /// Encode a call frame from JSON arguments
    EncodeCall {
        /// Interface file path
        #[arg(short, long)]
        config: PathBuf,

        /// Interface name
        #[arg(short, long)]
        interface: String,

        /// Method name (inherited methods included)
        #[arg(short, long)]
        method: String,

        /// JSON array with one value per in/inout parameter
        #[arg(short, long, default_value = "[]")]
        args: String,
    },

    /// Decode a call frame given as hex
    DecodeCall {
        /// Interface file path
        #[arg(short, long)]
        config: PathBuf,

        /// Frame bytes in hex
        #[arg(long)]
        hex: String,
    },

    /// Decode a reply frame given as hex
    DecodeReply {
        /// Interface file path
        #[arg(short, long)]
        config: PathBuf,

        /// Interface name
        #[arg(short, long)]
        interface: String,

        /// Method the reply answers
        #[arg(short, long)]
        method: String,

        /// Frame bytes in hex
        #[arg(long)]
        hex: String,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let prefix = args.id_prefix;
    match args.command {
        Commands::GenConfig { output } => cmd_gen_config(&output),
        Commands::Validate { config } => cmd_validate(&config, prefix),
        Commands::Describe { config, interface } => {
            cmd_describe(&config, prefix, interface.as_deref())
        }
        Commands::EncodeCall {
            config,
            interface,
            method,
            args,
        } => cmd_encode_call(&config, prefix, &interface, &method, &args),
        Commands::DecodeCall { config, hex } => cmd_decode_call(&config, prefix, &hex),
        Commands::DecodeReply {
            config,
            interface,
            method,
            hex,
        } => cmd_decode_reply(&config, prefix, &interface, &method, &hex),
    }
}

fn load_store(path: &Path, prefix: u64) -> anyhow::Result<Arc<TypeStore>> {
    let file = InterfaceFile::from_file(path)
        .with_context(|| format!("loading {}", path.display()))?;
    let store = file.build_store(&SequentialIdAllocator::new(prefix))?;
    tracing::debug!(
        "{}: {} interfaces, {} records",
        path.display(),
        store.len(),
        store.records().count()
    );
    Ok(store.publish())
}

fn find_interface<'a>(store: &'a TypeStore, name: &str) -> anyhow::Result<&'a InterfaceDescriptor> {
    store
        .resolve_by_name(name)
        .ok_or_else(|| anyhow!("no interface named '{}'", name))
}

fn sorted_interfaces(store: &TypeStore) -> Vec<&InterfaceDescriptor> {
    let mut ifaces: Vec<&InterfaceDescriptor> = store.interfaces().collect();
    ifaces.sort_by_key(|d| (store.chain(d.id).count(), d.name.clone()));
    ifaces
}

fn cmd_gen_config(output: &Path) -> anyhow::Result<()> {
    let content = InterfaceFile::example().to_toml_string()?;
    let header = "# ORPC interface definitions\n\
                  # Types use the compact grammar: i32, string, f64[], *variant, Point, ...\n\n";
    std::fs::write(output, format!("{}{}", header, content))?;
    println!("Generated interface file: {}", output.display());
    Ok(())
}

fn cmd_validate(config: &Path, prefix: u64) -> anyhow::Result<()> {
    let store = load_store(config, prefix)?;

    println!("[OK] {} is valid", config.display());
    println!();
    let mut records: Vec<_> = store.records().collect();
    records.sort_by(|a, b| a.name.cmp(&b.name));
    for record in records {
        println!("  record {} ({} fields)", record.name, record.fields.len());
    }
    for iface in sorted_interfaces(&store) {
        let base = iface
            .base
            .and_then(|b| store.resolve(b))
            .map(|b| format!(" : {}", b.name))
            .unwrap_or_default();
        println!(
            "  {}{} {} ordinals {}..{} fingerprint {}",
            iface.name,
            base,
            iface.id,
            iface.first_ordinal,
            iface.next_ordinal(),
            iface.fingerprint()
        );
    }
    Ok(())
}

fn cmd_describe(config: &Path, prefix: u64, only: Option<&str>) -> anyhow::Result<()> {
    let store = load_store(config, prefix)?;
    let ifaces = match only {
        Some(name) => vec![find_interface(&store, name)?],
        None => sorted_interfaces(&store),
    };

    for iface in ifaces {
        let vtable = VTable::build(&store, iface.id)?;
        println!("{} {}", vtable.name(), vtable.interface_id());
        for entry in vtable.iter() {
            let declared = if entry.declared_in == iface.id {
                String::new()
            } else {
                store
                    .resolve(entry.declared_in)
                    .map(|d| format!("  [{}]", d.name))
                    .unwrap_or_default()
            };
            println!("  #{:<3} {}{}", entry.ordinal, entry.method.signature(), declared);
        }
        println!();
    }
    Ok(())
}

fn cmd_encode_call(
    config: &Path,
    prefix: u64,
    interface: &str,
    method: &str,
    args: &str,
) -> anyhow::Result<()> {
    let store = load_store(config, prefix)?;
    let iface = find_interface(&store, interface)?;
    let desc = store.method_by_name(iface.id, method)?;

    let raw: serde_json::Value = serde_json::from_str(args).context("--args is not JSON")?;
    let raw = raw
        .as_array()
        .ok_or_else(|| anyhow!("--args must be a JSON array"))?;
    let inputs: Vec<_> = desc.inputs().collect();
    if raw.len() != inputs.len() {
        bail!(
            "{} takes {} arguments ({}), got {}",
            desc.name,
            inputs.len(),
            desc.signature(),
            raw.len()
        );
    }
    let values = inputs
        .iter()
        .zip(raw)
        .map(|(param, value)| {
            json::to_tagged(&store, &param.ty, value)
                .with_context(|| format!("argument '{}'", param.name))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let frame = Marshaler::new(store.clone()).marshal_call(iface.id, desc.ordinal, &values)?;
    println!("{}", hex::encode(&frame));
    Ok(())
}

fn cmd_decode_call(config: &Path, prefix: u64, text: &str) -> anyhow::Result<()> {
    let store = load_store(config, prefix)?;
    let frame = hex::decode(text)?;
    let call = Marshaler::new(store.clone()).unmarshal_call(&frame)?;
    let method = store.lookup_method(call.interface_id, call.ordinal)?;
    let iface = store
        .resolve(call.interface_id)
        .map(|d| d.name.as_str())
        .unwrap_or("?");

    println!("{}::{} (#{})", iface, method.name, call.ordinal);
    for (param, value) in method.inputs().zip(&call.args) {
        println!(
            "  {} {} = {}",
            param.direction,
            param.name,
            json::from_tagged(value)?
        );
    }
    Ok(())
}

fn cmd_decode_reply(
    config: &Path,
    prefix: u64,
    interface: &str,
    method: &str,
    text: &str,
) -> anyhow::Result<()> {
    let store = load_store(config, prefix)?;
    let iface = find_interface(&store, interface)?;
    let desc = store.method_by_name(iface.id, method)?;
    let frame = hex::decode(text)?;

    let (outputs, return_value) = Marshaler::new(store.clone()).unmarshal_reply(&frame, desc)?;
    println!("{}::{} reply", iface.name, desc.name);
    for (param, value) in desc.outputs().zip(&outputs) {
        println!("  {} = {}", param.name, json::from_tagged(value)?);
    }
    if let Some(value) = return_value {
        println!("  -> {}", json::from_tagged(&value)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orpc::TaggedValue;

    fn write_example(dir: &Path) -> PathBuf {
        let path = dir.join("interfaces.toml");
        cmd_gen_config(&path).unwrap();
        path
    }

    #[test]
    fn test_gen_config_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_example(dir.path());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# ORPC interface definitions"));

        let store = load_store(&path, 0).unwrap();
        assert!(store.is_published());
        assert!(find_interface(&store, "IShapes").is_ok());
        assert!(find_interface(&store, "INope").is_err());
    }

    #[test]
    fn test_encode_matches_marshaler() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_example(dir.path());
        let store = load_store(&path, 0).unwrap();
        let shapes = find_interface(&store, "IShapes").unwrap();
        let scale = store.method_by_name(shapes.id, "Scale").unwrap();

        let args: Vec<TaggedValue> = scale
            .inputs()
            .zip([serde_json::json!(1.5), serde_json::json!("x")].iter())
            .map(|(p, v)| json::to_tagged(&store, &p.ty, v).unwrap())
            .collect();
        let frame = Marshaler::new(store.clone())
            .marshal_call(shapes.id, scale.ordinal, &args)
            .unwrap();

        let call = Marshaler::new(store.clone()).unmarshal_call(&frame).unwrap();
        assert_eq!(call.ordinal, 2);
        assert_eq!(call.args.len(), 2);
        assert!(cmd_decode_call(&path, 0, &hex::encode(&frame)).is_ok());
    }

    #[test]
    fn test_encode_rejects_wrong_arity() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_example(dir.path());
        assert!(cmd_encode_call(&path, 0, "IShapes", "Scale", "[1.5]").is_err());
        assert!(cmd_encode_call(&path, 0, "IShapes", "Scale", "{}").is_err());
        assert!(cmd_encode_call(&path, 0, "IShapes", "Scale", "[1.5, \"x\"]").is_ok());
        assert!(cmd_encode_call(&path, 0, "IShapes", "Ping", "[]").is_ok());
    }

    #[test]
    fn test_describe_and_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_example(dir.path());
        assert!(cmd_validate(&path, 0).is_ok());
        assert!(cmd_describe(&path, 0, None).is_ok());
        assert!(cmd_describe(&path, 0, Some("IShapes")).is_ok());
        assert!(cmd_describe(&path, 0, Some("Missing")).is_err());
    }

    #[test]
    fn test_decode_fault_reply() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_example(dir.path());
        // Status 3 (invalid argument), message "no".
        let frame = "03 00 00 00 02 00 00 00 6e 6f";
        let err = cmd_decode_reply(&path, 0, "IShapes", "Ping", frame).unwrap_err();
        assert!(err.to_string().contains("no"));
    }
}
