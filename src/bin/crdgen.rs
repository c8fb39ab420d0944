//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions of every kind this controller serves.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/akash.crossplane.io.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use akash_provider::crd::{AkashDeployment, ProviderConfig, ProviderConfigUsage};
use kube::core::CustomResourceExt;

fn main() {
    let crds = [
        AkashDeployment::crd(),
        ProviderConfig::crd(),
        ProviderConfigUsage::crd(),
    ];

    println!("# This file is auto-generated by crdgen");
    println!("# DO NOT EDIT THIS FILE MANUALLY");
    for crd in &crds {
        match serde_yaml::to_string(crd) {
            Ok(yaml) => {
                println!("---");
                print!("{yaml}");
            }
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
}
