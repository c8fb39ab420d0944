//! # Finalizers
//!
//! Add and remove finalizers with merge patches carrying the full list.

use std::fmt::Debug;

use kube::api::{Api, Patch, PatchParams};
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use tracing::debug;

#[must_use]
pub fn has_finalizer<K: Resource>(obj: &K, finalizer: &str) -> bool {
    obj.finalizers().iter().any(|f| f == finalizer)
}

/// The finalizer list of `current` with `finalizer` present or absent.
/// `None` when nothing changes.
#[must_use]
pub fn toggled(current: &[String], finalizer: &str, present: bool) -> Option<Vec<String>> {
    let has = current.iter().any(|f| f == finalizer);
    if has == present {
        return None;
    }
    let mut finalizers: Vec<String> = current
        .iter()
        .filter(|f| *f != finalizer)
        .cloned()
        .collect();
    if present {
        finalizers.push(finalizer.to_string());
    }
    Some(finalizers)
}

/// Make sure `finalizer` is present (`true`) or absent (`false`) on `obj`
///
/// # Errors
///
/// Returns the API error when the patch is rejected.
pub async fn set_finalizer<K>(
    api: &Api<K>,
    obj: &K,
    finalizer: &str,
    present: bool,
) -> Result<(), kube::Error>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let Some(finalizers) = toggled(obj.finalizers(), finalizer, present) else {
        return Ok(());
    };
    let name = obj.name_any();
    let patch = serde_json::json!({
        "metadata": { "finalizers": finalizers }
    });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(patch))
        .await?;
    debug!(%name, finalizer, present, "finalizer updated");
    Ok(())
}
