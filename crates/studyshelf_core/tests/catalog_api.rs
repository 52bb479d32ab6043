use chrono::{DateTime, Duration, TimeZone, Utc};
use std::cell::Cell;
use std::path::Path;
use studyshelf_core::{
    AddPdfOutcome, Catalog, CatalogError, CatalogPersistence, DocumentViewer, FileIngestionService,
    FilePicker, IngestionError, KeyValueStore, KvSnapshotStore, LoadedCatalog, ManualClock,
    Material, MaterialId, MaterialKind, MaterialOrder, MaterialQuery, MaterialValidationError,
    PersistenceError, PickedFile, SqliteKeyValueStore,
};

struct CannedPicker(Option<PickedFile>);

impl FilePicker for CannedPicker {
    fn pick_pdf(&mut self) -> Option<PickedFile> {
        self.0.take()
    }
}

#[derive(Default)]
struct RecordingViewer {
    opened: Vec<String>,
}

impl DocumentViewer for RecordingViewer {
    fn open(&mut self, uri: &str) {
        self.opened.push(uri.to_string());
    }
}

/// Delegates to a real snapshot store but can be told to reject saves.
struct FlakyPersistence<'kv> {
    inner: KvSnapshotStore<&'kv SqliteKeyValueStore>,
    fail_saves: Cell<bool>,
}

impl CatalogPersistence for FlakyPersistence<'_> {
    fn save(&self, materials: &[Material]) -> Result<(), PersistenceError> {
        if self.fail_saves.get() {
            return Err(PersistenceError::WriteFailed(
                studyshelf_core::KvError::InvalidKey,
            ));
        }
        self.inner.save(materials)
    }

    fn load(&self) -> Result<LoadedCatalog, PersistenceError> {
        self.inner.load()
    }
}

fn start_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 18, 30, 0).unwrap()
}

fn write_file(path: &Path, len: usize) {
    let bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    std::fs::write(path, bytes).unwrap();
}

#[test]
fn load_on_first_run_returns_empty_catalog() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open(data.path().join("catalog.sqlite3")).unwrap();
    let clock = ManualClock::new(start_time());

    let catalog = Catalog::open_with_clock(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(data.path().join("pdfs")),
        &clock,
    )
    .unwrap();

    assert!(catalog.list().is_empty());
    assert!(!catalog.is_dirty());
}

#[test]
fn add_note_on_empty_catalog_creates_one_note() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let clock = ManualClock::new(start_time());
    let mut catalog = Catalog::open_with_clock(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(data.path().join("pdfs")),
        &clock,
    )
    .unwrap();

    let note = catalog.add_note("Title", "Body").unwrap();

    let listed = catalog.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].kind, MaterialKind::Note);
    assert_eq!(listed[0].uri, None);
    assert_eq!(listed[0].file_size, None);
    assert_eq!(listed[0].description.as_deref(), Some("Body"));
    assert_eq!(listed[0].created_at, start_time());
    assert_eq!(listed[0], note);
}

#[test]
fn add_note_rejects_blank_title_without_touching_storage() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let mut catalog = Catalog::open(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(data.path().join("pdfs")),
    )
    .unwrap();

    let err = catalog.add_note("   ", "body").unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Validation(MaterialValidationError::EmptyTitle)
    ));
    assert!(catalog.is_empty());
    assert_eq!(kv.get("study_materials").unwrap(), None);
}

#[test]
fn ingesting_calc_pdf_survives_save_and_reload() {
    let data = tempfile::tempdir().unwrap();
    let picked_dir = tempfile::tempdir().unwrap();
    let source = picked_dir.path().join("calc.pdf");
    write_file(&source, 2_097_152);

    let kv = SqliteKeyValueStore::open(data.path().join("catalog.sqlite3")).unwrap();
    let clock = ManualClock::new(start_time());
    let storage_dir = data.path().join("pdfs");
    let mut catalog = Catalog::open_with_clock(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(&storage_dir),
        &clock,
    )
    .unwrap();

    let mut picker = CannedPicker(Some(PickedFile::new("calc.pdf", &source)));
    let AddPdfOutcome::Added(pdf) = catalog.add_pdf(&mut picker).unwrap() else {
        panic!("picker returned a file, expected Added");
    };

    assert_eq!(pdf.kind, MaterialKind::Pdf);
    assert_eq!(pdf.title, "calc.pdf");
    assert_eq!(pdf.file_size, Some(2_097_152));
    assert_eq!(pdf.created_at, start_time());
    let uri = pdf.uri.clone().unwrap();
    assert!(uri.ends_with("calc.pdf"), "unexpected uri {uri}");
    assert!(Path::new(&uri).starts_with(&storage_dir));
    assert_eq!(std::fs::read(&uri).unwrap(), std::fs::read(&source).unwrap());

    let reloaded = Catalog::open_with_clock(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(&storage_dir),
        &clock,
    )
    .unwrap();
    assert_eq!(reloaded.get(&pdf.id), Some(pdf));
}

#[test]
fn cancelled_pick_is_a_no_op() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let mut catalog = Catalog::open(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(data.path().join("pdfs")),
    )
    .unwrap();

    let outcome = catalog.add_pdf(&mut CannedPicker(None)).unwrap();
    assert_eq!(outcome, AddPdfOutcome::Cancelled);
    assert!(catalog.is_empty());
    assert!(!data.path().join("pdfs").exists());
}

#[test]
fn failed_ingestion_never_links_an_entry() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let blocker = data.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let mut catalog = Catalog::open(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(blocker.join("pdfs")),
    )
    .unwrap();

    let missing = PickedFile::new("gone.pdf", data.path().join("gone.pdf"));
    let err = catalog.add_picked_pdf(&missing).unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Ingestion(IngestionError::SourceUnreadable { .. })
    ));

    let source = data.path().join("lecture.pdf");
    write_file(&source, 1024);
    let err = catalog
        .add_picked_pdf(&PickedFile::new("lecture.pdf", &source))
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Ingestion(IngestionError::DestinationUnwritable { .. })
    ));

    assert!(catalog.is_empty());
    assert_eq!(kv.get("study_materials").unwrap(), None);
}

#[test]
fn every_reachable_uri_has_a_backing_file() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let mut catalog = Catalog::open(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(data.path().join("pdfs")),
    )
    .unwrap();

    for (index, name) in ["a.pdf", "b.pdf", "a.pdf"].iter().enumerate() {
        let source = data.path().join(format!("src-{index}.pdf"));
        write_file(&source, 100 + index);
        catalog
            .add_picked_pdf(&PickedFile::new(*name, &source))
            .unwrap();
    }
    let _ = catalog.add_picked_pdf(&PickedFile::new("x.pdf", data.path().join("missing.pdf")));

    assert_eq!(catalog.len(), 3);
    for material in catalog.list() {
        let uri = material.uri.expect("pdf entries carry a uri");
        let metadata = std::fs::metadata(&uri).unwrap();
        assert_eq!(Some(metadata.len()), material.file_size);
    }
}

#[test]
fn toggle_favorite_twice_restores_original_value() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let mut catalog = Catalog::open(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(data.path().join("pdfs")),
    )
    .unwrap();
    let note = catalog.add_note("Vectors", "").unwrap();

    assert!(catalog.toggle_favorite(&note.id).unwrap().is_favorite);
    assert!(!catalog.toggle_favorite(&note.id).unwrap().is_favorite);
    assert_eq!(catalog.get(&note.id), Some(note));
}

#[test]
fn mutations_on_unknown_id_are_not_found() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let mut catalog = Catalog::open(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(data.path().join("pdfs")),
    )
    .unwrap();
    let stray = MaterialId::generate();

    assert!(matches!(
        catalog.toggle_favorite(&stray),
        Err(CatalogError::NotFound(id)) if id == stray
    ));
    assert!(matches!(
        catalog.record_access(&stray),
        Err(CatalogError::NotFound(id)) if id == stray
    ));
}

#[test]
fn unfiltered_search_returns_reverse_insertion_order() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let clock = ManualClock::new(start_time());
    let mut catalog = Catalog::open_with_clock(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(data.path().join("pdfs")),
        &clock,
    )
    .unwrap();

    let mut inserted = Vec::new();
    for title in ["one", "two", "three", "four"] {
        inserted.push(catalog.add_note(title, "").unwrap().id);
    }
    // Mutating an old entry must not move it.
    catalog.toggle_favorite(&inserted[0]).unwrap();

    let ids: Vec<_> = catalog
        .search(&MaterialQuery::default())
        .into_iter()
        .map(|m| m.id)
        .collect();
    inserted.reverse();
    assert_eq!(ids, inserted);
}

#[test]
fn record_access_strictly_increases_even_when_clock_stalls() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let clock = ManualClock::new(start_time());
    let mut catalog = Catalog::open_with_clock(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(data.path().join("pdfs")),
        &clock,
    )
    .unwrap();
    let note = catalog.add_note("Stalled clock", "").unwrap();

    let first = catalog.record_access(&note.id).unwrap().last_accessed.unwrap();
    let second = catalog.record_access(&note.id).unwrap().last_accessed.unwrap();
    clock.advance(Duration::minutes(3));
    let third = catalog.record_access(&note.id).unwrap().last_accessed.unwrap();
    clock.set(start_time() - Duration::hours(1));
    let fourth = catalog.record_access(&note.id).unwrap().last_accessed.unwrap();

    assert_eq!(first, start_time());
    assert!(first < second);
    assert_eq!(third, start_time() + Duration::minutes(3));
    assert!(third < fourth);
    assert_eq!(catalog.get(&note.id).unwrap().created_at, start_time());
}

#[test]
fn search_composes_text_tag_and_favorite_filters() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let mut catalog = Catalog::open(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(data.path().join("pdfs")),
    )
    .unwrap();

    let thermo = catalog.add_note("Thermodynamics", "Entropy and heat").unwrap();
    let optics = catalog.add_note("Optics", "Lenses and HEAT lamps").unwrap();
    let algebra = catalog.add_note("Linear Algebra", "Eigenvalues").unwrap();
    catalog
        .set_tags(&thermo.id, vec!["physics".into(), "exam".into(), "exam".into()])
        .unwrap();
    catalog.set_tags(&optics.id, vec!["physics".into()]).unwrap();
    catalog.set_tags(&algebra.id, vec!["math".into()]).unwrap();
    catalog.toggle_favorite(&thermo.id).unwrap();

    let heat: Vec<_> = catalog
        .search(&MaterialQuery::text("heat"))
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(heat, vec![optics.id.clone(), thermo.id.clone()]);

    let physics_or_math = catalog.search(&MaterialQuery::default().with_tags(["math", "physics"]));
    assert_eq!(physics_or_math.len(), 3);

    let favourite_physics = catalog.search(
        &MaterialQuery::text("HEAT")
            .with_tags(["physics"])
            .favorites_only(),
    );
    assert_eq!(favourite_physics.len(), 1);
    assert_eq!(favourite_physics[0].id, thermo.id);
    assert_eq!(
        favourite_physics[0].tags,
        vec!["physics".to_string(), "exam".to_string(), "exam".to_string()]
    );

    assert!(catalog.search(&MaterialQuery::text("quantum")).is_empty());
}

#[test]
fn open_material_records_access_and_invokes_viewer() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let clock = ManualClock::new(start_time());
    let mut catalog = Catalog::open_with_clock(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(data.path().join("pdfs")),
        &clock,
    )
    .unwrap();
    let source = data.path().join("source.pdf");
    write_file(&source, 64);
    let pdf = catalog
        .add_picked_pdf(&PickedFile::new("notes.pdf", &source))
        .unwrap();
    let note = catalog.add_note("Plain note", "").unwrap();

    clock.advance(Duration::seconds(30));
    let mut viewer = RecordingViewer::default();
    let opened = catalog.open_material(&pdf.id, &mut viewer).unwrap();
    assert_eq!(viewer.opened, vec![pdf.uri.clone().unwrap()]);
    assert_eq!(
        opened.last_accessed,
        Some(start_time() + Duration::seconds(30))
    );

    let err = catalog.open_material(&note.id, &mut viewer).unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Validation(MaterialValidationError::NotOpenable(id)) if id == note.id
    ));
    assert_eq!(viewer.opened.len(), 1);
}

#[test]
fn save_and_load_round_trip_after_mixed_operations() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open(data.path().join("catalog.sqlite3")).unwrap();
    let clock = ManualClock::new(start_time());
    let storage_dir = data.path().join("pdfs");
    let mut catalog = Catalog::open_with_clock(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(&storage_dir),
        &clock,
    )
    .unwrap();

    let note = catalog.add_note("Cells", "Mitochondria").unwrap();
    clock.advance(Duration::milliseconds(1_500));
    let source = data.path().join("bio.pdf");
    write_file(&source, 4096);
    let pdf = catalog
        .add_picked_pdf(&PickedFile::new("bio.pdf", &source))
        .unwrap();
    clock.advance(Duration::nanoseconds(123_456_789));
    catalog.record_access(&pdf.id).unwrap();
    catalog.toggle_favorite(&note.id).unwrap();
    catalog.set_tags(&note.id, vec!["bio".into()]).unwrap();

    let before = catalog.list();
    drop(catalog);

    let reloaded = Catalog::open_with_clock(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(&storage_dir),
        &clock,
    )
    .unwrap();
    assert_eq!(reloaded.list(), before);
}

#[test]
fn failed_save_keeps_mutation_and_marks_dirty_until_flush() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let persistence = FlakyPersistence {
        inner: KvSnapshotStore::new(&kv),
        fail_saves: Cell::new(false),
    };
    let mut catalog =
        Catalog::open(persistence, FileIngestionService::new(data.path().join("pdfs"))).unwrap();
    let note = catalog.add_note("Persisted", "").unwrap();

    catalog.persistence().fail_saves.set(true);
    let err = catalog.toggle_favorite(&note.id).unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Persistence(PersistenceError::WriteFailed(_))
    ));
    assert!(catalog.is_dirty());
    assert!(catalog.get(&note.id).unwrap().is_favorite);

    let stored = KvSnapshotStore::new(&kv).load().unwrap();
    assert!(!stored.materials[0].is_favorite);

    catalog.persistence().fail_saves.set(false);
    catalog.flush().unwrap();
    assert!(!catalog.is_dirty());
    let stored = KvSnapshotStore::new(&kv).load().unwrap();
    assert!(stored.materials[0].is_favorite);
}

#[test]
fn record_access_at_latest_instant_is_rejected_without_panicking() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let mut stored = Material::note("Far future", "", start_time()).unwrap();
    stored.last_accessed = Some(DateTime::<Utc>::MAX_UTC);
    KvSnapshotStore::new(&kv)
        .save(std::slice::from_ref(&stored))
        .unwrap();

    let clock = ManualClock::new(start_time());
    let mut catalog = Catalog::open_with_clock(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(data.path().join("pdfs")),
        &clock,
    )
    .unwrap();
    assert_eq!(catalog.get(&stored.id), Some(stored.clone()));

    let err = catalog.record_access(&stored.id).unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Validation(MaterialValidationError::AccessStampExhausted(id))
            if id == stored.id
    ));
    assert_eq!(catalog.get(&stored.id), Some(stored));
    assert!(!catalog.is_dirty());
}

#[test]
fn interrupted_copy_never_links_an_entry() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let clock = ManualClock::new(start_time());
    let storage_dir = data.path().join("pdfs");
    let mut catalog = Catalog::open_with_clock(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(&storage_dir),
        &clock,
    )
    .unwrap();

    let millis = start_time().timestamp_millis();
    let partial = storage_dir.join(format!(".{millis}-lecture.pdf.partial"));
    std::fs::create_dir_all(&partial).unwrap();
    let source = data.path().join("lecture.pdf");
    write_file(&source, 2048);

    let err = catalog
        .add_picked_pdf(&PickedFile::new("lecture.pdf", &source))
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Ingestion(IngestionError::CopyFailed { .. })
    ));
    assert!(catalog.is_empty());
    assert_eq!(kv.get("study_materials").unwrap(), None);
    assert!(!storage_dir.join(format!("{millis}-lecture.pdf")).exists());
}

#[test]
fn search_can_order_by_title_or_recent_access() {
    let data = tempfile::tempdir().unwrap();
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let clock = ManualClock::new(start_time());
    let mut catalog = Catalog::open_with_clock(
        KvSnapshotStore::new(&kv),
        FileIngestionService::new(data.path().join("pdfs")),
        &clock,
    )
    .unwrap();

    let waves = catalog.add_note("waves", "").unwrap();
    let atoms = catalog.add_note("Atoms", "").unwrap();
    let motion = catalog.add_note("motion", "").unwrap();
    clock.advance(Duration::seconds(5));
    catalog.record_access(&waves.id).unwrap();
    clock.advance(Duration::seconds(5));
    catalog.record_access(&atoms.id).unwrap();

    let titles = |order: MaterialOrder| -> Vec<String> {
        catalog
            .search(&MaterialQuery::default().ordered_by(order))
            .into_iter()
            .map(|m| m.title)
            .collect()
    };
    assert_eq!(titles(MaterialOrder::Title), vec!["Atoms", "motion", "waves"]);
    assert_eq!(
        titles(MaterialOrder::RecentlyAccessed),
        vec!["Atoms", "waves", "motion"]
    );
    assert_eq!(titles(MaterialOrder::Newest), vec!["motion", "Atoms", "waves"]);
    assert_eq!(catalog.get(&motion.id).unwrap().last_accessed, None);
}
