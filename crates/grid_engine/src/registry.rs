//! Mount contract towards whatever actually renders programs.

use std::collections::BTreeMap;

use shared::domain::{ProgramId, SpanGroup};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MountHandle(pub u64);

/// Renders a program into the rectangle described by its span group.
pub trait ProgramHost: Send + Sync {
    fn mount(&self, group: &SpanGroup) -> anyhow::Result<MountHandle>;
    fn unmount(&self, handle: MountHandle);
}

/// Host that renders nothing; every mount succeeds.
#[derive(Debug, Default)]
pub struct HeadlessHost;

impl ProgramHost for HeadlessHost {
    fn mount(&self, _group: &SpanGroup) -> anyhow::Result<MountHandle> {
        Ok(MountHandle(0))
    }

    fn unmount(&self, _handle: MountHandle) {}
}

/// Which span group is mounted under which handle.
#[derive(Debug, Default)]
pub struct MountTracker {
    mounted: BTreeMap<ProgramId, (SpanGroup, MountHandle)>,
}

impl MountTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings mounts in line with `groups`: unchanged groups stay, moved or
    /// resized groups are re-mounted, vacated ones are unmounted.
    ///
    /// Returns programs whose mount failed; the grid change itself stands.
    pub fn reconcile(&mut self, host: &dyn ProgramHost, groups: &[SpanGroup]) -> Vec<ProgramId> {
        let stale: Vec<ProgramId> = self
            .mounted
            .iter()
            .filter(|(program, (mounted, _))| {
                !groups
                    .iter()
                    .any(|group| group.program == **program && group == mounted)
            })
            .map(|(program, _)| program.clone())
            .collect();
        for program in stale {
            if let Some((_, handle)) = self.mounted.remove(&program) {
                debug!(program = %program, "unmounting");
                host.unmount(handle);
            }
        }

        let mut failed = Vec::new();
        for group in groups {
            if self.mounted.contains_key(&group.program) {
                continue;
            }
            match host.mount(group) {
                Ok(handle) => {
                    debug!(program = %group.program, cells = group.positions.len(), "mounted");
                    self.mounted
                        .insert(group.program.clone(), (group.clone(), handle));
                }
                Err(error) => {
                    warn!(program = %group.program, %error, "program mount failed");
                    failed.push(group.program.clone());
                }
            }
        }
        failed
    }

    pub fn is_mounted(&self, program: &ProgramId) -> bool {
        self.mounted.contains_key(program)
    }

    pub fn len(&self) -> usize {
        self.mounted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
