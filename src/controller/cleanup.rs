//! Sweep for experiments left behind by crashed runs

use tracing::{info, warn};

use crate::client::ChaosApi;
use crate::crd::ResourceKind;

/// Delete every chaos resource of every known kind in `namespace`.
///
/// `label_selector` (e.g. `created-by=chaos-harness`) narrows the sweep. With
/// `dry_run` nothing is deleted and matches are only logged. A kind that cannot
/// be listed (not installed, forbidden) is logged and skipped, as is a resource
/// whose delete fails. Returns the number of resources deleted, or that would
/// have been deleted.
pub async fn cleanup_orphaned<C: ChaosApi + ?Sized>(
    client: &C,
    namespace: &str,
    label_selector: Option<&str>,
    dry_run: bool,
) -> usize {
    let mut cleaned = 0;

    for kind in ResourceKind::ALL {
        let items = match client
            .list(kind, namespace, label_selector.map(str::to_string))
            .await
        {
            Ok(items) => items,
            Err(e) => {
                warn!(kind = %kind, namespace = %namespace, error = %e, "Failed to list chaos resources");
                continue;
            }
        };

        for item in items {
            let Some(name) = item.metadata.name.as_deref() else {
                continue;
            };

            if dry_run {
                info!(kind = %kind, namespace = %namespace, name = %name, "[dry-run] Would delete orphaned experiment");
                cleaned += 1;
                continue;
            }

            info!(kind = %kind, namespace = %namespace, name = %name, "Deleting orphaned experiment");
            match client.delete(kind, namespace, name).await {
                Ok(()) => cleaned += 1,
                Err(e) => {
                    warn!(kind = %kind, namespace = %namespace, name = %name, error = %e, "Failed to delete orphaned experiment")
                }
            }
        }
    }

    cleaned
}
