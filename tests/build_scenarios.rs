//! End-to-end scenarios spanning the facade, the dependency database, and
//! the scheduler together, as opposed to the unit tests living alongside
//! each module.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ucbuild::{BuildEngine, BuildOptions, DependencyDb, OutdatedFlag, Target};

fn write_file(path: &Path, contents: &[u8]) {
    let mut f = fs::File::create(path).unwrap();
    f.write_all(contents).unwrap();
}

/// A target standing in for "compile one source file", backed by a real
/// `DependencyDb` so the header-only-rebuild scenario exercises the
/// genuine `.d`-file parsing and JSON persistence path, not a stub.
struct CompileSource {
    outdated: OutdatedFlag,
    dep_file: std::path::PathBuf,
    db: Arc<DependencyDb>,
    execute_count: Arc<AtomicUsize>,
}

impl Target for CompileSource {
    fn predecessors(&self) -> &[Arc<dyn Target>] {
        &[]
    }
    fn outdated_flag(&self) -> &OutdatedFlag {
        &self.outdated
    }
    fn prepare(&self) -> bool {
        self.db.are_depends_outdated(&self.dep_file, 0)
    }
    fn execute(&self) -> bool {
        self.execute_count.fetch_add(1, Ordering::SeqCst);
        true
    }
}

#[test]
fn header_only_rebuild_recompiles_only_the_affected_source() {
    let dir = tempfile::tempdir().unwrap();
    let header = dir.path().join("h.h");
    write_file(&header, b"#define X 1\n");
    let dep_file = dir.path().join("s.d");
    write_file(
        &dep_file,
        format!("s.o: s.c {}", header.display()).as_bytes(),
    );
    let db_path = dir.path().join("depdb.json");

    let execute_count = Arc::new(AtomicUsize::new(0));

    // First build: the header is unknown to the (empty) reference table,
    // so the source compiles once.
    {
        let db = Arc::new(DependencyDb::new(&db_path, None));
        let root: Arc<dyn Target> = Arc::new(CompileSource {
            outdated: OutdatedFlag::new(),
            dep_file: dep_file.clone(),
            db: db.clone(),
            execute_count: execute_count.clone(),
        });
        let engine = BuildEngine::new(BuildOptions::default());
        let result = engine.execute(&root).unwrap();
        assert_eq!(result, ucbuild::BuildResult { total_jobs: 1, completed_jobs: 1 });
        db.save(&db_path).unwrap();
    }
    assert_eq!(execute_count.load(Ordering::SeqCst), 1);

    // Second build, nothing changed: no recompilation.
    {
        let db = Arc::new(DependencyDb::new(&db_path, None));
        let root: Arc<dyn Target> = Arc::new(CompileSource {
            outdated: OutdatedFlag::new(),
            dep_file: dep_file.clone(),
            db: db.clone(),
            execute_count: execute_count.clone(),
        });
        let engine = BuildEngine::new(BuildOptions::default());
        let result = engine.execute(&root).unwrap();
        assert_eq!(result, ucbuild::BuildResult::default());
        db.save(&db_path).unwrap();
    }
    assert_eq!(execute_count.load(Ordering::SeqCst), 1);

    // Touch the header; the source must recompile.
    let future = filetime::FileTime::from_unix_time(
        filetime::FileTime::from_system_time(std::time::SystemTime::now()).unix_seconds() + 1000,
        0,
    );
    filetime::set_file_mtime(&header, future).unwrap();

    {
        let db = Arc::new(DependencyDb::new(&db_path, None));
        let root: Arc<dyn Target> = Arc::new(CompileSource {
            outdated: OutdatedFlag::new(),
            dep_file,
            db,
            execute_count: execute_count.clone(),
        });
        let engine = BuildEngine::new(BuildOptions::default());
        let result = engine.execute(&root).unwrap();
        assert_eq!(result, ucbuild::BuildResult { total_jobs: 1, completed_jobs: 1 });
    }
    assert_eq!(execute_count.load(Ordering::SeqCst), 2);
}

struct TimelineTarget {
    name: &'static str,
    preds: Vec<Arc<dyn Target>>,
    outdated: OutdatedFlag,
    timeline: Arc<Mutex<Vec<&'static str>>>,
}

impl Target for TimelineTarget {
    fn predecessors(&self) -> &[Arc<dyn Target>] {
        &self.preds
    }
    fn outdated_flag(&self) -> &OutdatedFlag {
        &self.outdated
    }
    fn prepare(&self) -> bool {
        true
    }
    fn execute(&self) -> bool {
        self.timeline.lock().unwrap().push(self.name);
        true
    }
}

#[test]
fn topological_correctness_holds_for_a_wide_graph() {
    // A -> {B, C, D} -> E: every one of B, C, D must run strictly after A
    // and strictly before E, regardless of how the three middle targets
    // get interleaved with each other.
    let timeline = Arc::new(Mutex::new(Vec::new()));
    let mk = |name, preds: Vec<Arc<dyn Target>>| -> Arc<dyn Target> {
        Arc::new(TimelineTarget {
            name,
            preds,
            outdated: OutdatedFlag::new(),
            timeline: timeline.clone(),
        })
    };

    let a = mk("A", vec![]);
    let b = mk("B", vec![a.clone()]);
    let c = mk("C", vec![a.clone()]);
    let d = mk("D", vec![a.clone()]);
    let e = mk("E", vec![b, c, d]);

    let engine = BuildEngine::new(BuildOptions::default());
    let result = engine.execute(&e).unwrap();
    assert_eq!(result.completed_jobs, 5);

    let log = timeline.lock().unwrap();
    let pos = |name: &str| log.iter().position(|n| *n == name).unwrap();
    assert!(pos("A") < pos("B"));
    assert!(pos("A") < pos("C"));
    assert!(pos("A") < pos("D"));
    assert!(pos("B") < pos("E"));
    assert!(pos("C") < pos("E"));
    assert!(pos("D") < pos("E"));
}

#[test]
fn cyclic_graph_is_rejected_via_the_facade() {
    struct CyclicNode {
        preds: Mutex<Vec<Arc<dyn Target>>>,
        outdated: OutdatedFlag,
    }
    impl Target for CyclicNode {
        fn predecessors(&self) -> &[Arc<dyn Target>] {
            let guard = self.preds.lock().unwrap();
            let boxed: Box<[Arc<dyn Target>]> = guard.clone().into_boxed_slice();
            Box::leak(boxed)
        }
        fn outdated_flag(&self) -> &OutdatedFlag {
            &self.outdated
        }
    }

    let a: Arc<CyclicNode> = Arc::new(CyclicNode {
        preds: Mutex::new(vec![]),
        outdated: OutdatedFlag::new(),
    });
    let b: Arc<CyclicNode> = Arc::new(CyclicNode {
        preds: Mutex::new(vec![a.clone() as Arc<dyn Target>]),
        outdated: OutdatedFlag::new(),
    });
    a.preds.lock().unwrap().push(b as Arc<dyn Target>);

    let root: Arc<dyn Target> = a;
    let engine = BuildEngine::new(BuildOptions::default());
    let result = engine.execute(&root);
    assert!(matches!(result, Err(ucbuild::BuildError::CyclicDependency)));
}
