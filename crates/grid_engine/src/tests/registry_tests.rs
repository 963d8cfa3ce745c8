use super::*;
use std::sync::Mutex;

use anyhow::anyhow;

#[derive(Default)]
struct RecordingHost {
    calls: Mutex<Vec<String>>,
    next: Mutex<u64>,
    refuse: Option<ProgramId>,
}

impl ProgramHost for RecordingHost {
    fn mount(&self, group: &SpanGroup) -> anyhow::Result<MountHandle> {
        if self.refuse.as_ref() == Some(&group.program) {
            return Err(anyhow!("renderer unavailable"));
        }
        let mut next = self.next.lock().expect("lock");
        *next += 1;
        self.calls
            .lock()
            .expect("lock")
            .push(format!("mount {} {}", group.program, group.positions.len()));
        Ok(MountHandle(*next))
    }

    fn unmount(&self, handle: MountHandle) {
        self.calls
            .lock()
            .expect("lock")
            .push(format!("unmount {}", handle.0));
    }
}

fn group(program: &str, cells: &[&str]) -> SpanGroup {
    SpanGroup::new(
        ProgramId::from(program),
        cells.iter().map(|cell| cell.parse().expect("cell")).collect(),
    )
}

#[test]
fn remounts_only_changed_groups() {
    let host = RecordingHost::default();
    let mut tracker = MountTracker::new();

    tracker.reconcile(
        &host,
        &[group("voice", &["A-Top"]), group("monitoring", &["B-Top"])],
    );
    assert_eq!(tracker.len(), 2);

    // Monitoring grows, voice is untouched.
    tracker.reconcile(
        &host,
        &[
            group("voice", &["A-Top"]),
            group("monitoring", &["B-Top", "C-Top"]),
        ],
    );
    // Voice closes.
    tracker.reconcile(&host, &[group("monitoring", &["B-Top", "C-Top"])]);

    let calls = host.calls.lock().expect("lock").clone();
    assert_eq!(
        calls,
        vec![
            "mount voice 1",
            "mount monitoring 1",
            "unmount 2",
            "mount monitoring 2",
            "unmount 1",
        ]
    );
    assert!(!tracker.is_mounted(&ProgramId::from("voice")));
}

#[test]
fn mount_failures_are_reported_not_fatal() {
    let host = RecordingHost {
        refuse: Some(ProgramId::from("dicom-viewer")),
        ..RecordingHost::default()
    };
    let mut tracker = MountTracker::new();
    let failed = tracker.reconcile(
        &host,
        &[group("dicom-viewer", &["A-Top"]), group("voice", &["B-Top"])],
    );
    assert_eq!(failed, vec![ProgramId::from("dicom-viewer")]);
    assert!(tracker.is_mounted(&ProgramId::from("voice")));
}
