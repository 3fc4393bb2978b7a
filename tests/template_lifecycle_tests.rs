mod common;

use std::sync::Arc;

use common::{jpeg_bytes, png_bytes, MemoryTemplateStore, MockObjectStorage};
use tahfidz_docs_server::config::SchoolProfile;
use tahfidz_docs_server::pdf::{SignatureAsset, SignerRole};
use tahfidz_docs_server::report::{
    CertificateRequest, RenderError, RenderOptions, ReportService, StudentIdentity,
};
use tahfidz_docs_server::storage::ObjectStorage;
use tahfidz_docs_server::template::{TemplateError, TemplateRepository, TemplateValidator};

struct Fixture {
    store: Arc<MemoryTemplateStore>,
    storage: Arc<MockObjectStorage>,
    repository: Arc<TemplateRepository>,
}

fn fixture_with(validator: TemplateValidator, storage: MockObjectStorage) -> Fixture {
    let store = Arc::new(MemoryTemplateStore::new());
    let storage = Arc::new(storage);
    let repository = Arc::new(TemplateRepository::new(
        store.clone(),
        storage.clone(),
        Arc::new(validator),
    ));
    Fixture {
        store,
        storage,
        repository,
    }
}

fn fixture() -> Fixture {
    fixture_with(TemplateValidator::new(), MockObjectStorage::new())
}

fn certificate_request() -> CertificateRequest {
    CertificateRequest {
        student: StudentIdentity {
            name: "Zaid bin Tsabit".into(),
            student_number: "2024009".into(),
            class_name: "IX A".into(),
            halaqah: None,
        },
        achievement: "Juz 30".into(),
        predicate: Some("Mumtaz".into()),
        certificate_number: None,
        eligible: true,
        body: None,
        signer: SignatureAsset::new(SignerRole::Principal, "Ustadz Hasan", "Kepala Sekolah"),
    }
}

#[tokio::test]
async fn test_upload_records_actual_dimensions() {
    let f = fixture();
    let record = f
        .repository
        .upload(&png_bytes(1000, 700), "Wisuda 2026", "admin-01")
        .await
        .unwrap();

    assert_eq!((record.width, record.height), (1000, 700));
    assert!(record.is_active);
    assert!(record.storage_key.starts_with("/templates/"));
    assert!(record.storage_key.ends_with(".png"));
    assert!(f.storage.has_file(&record.storage_key).await);
}

#[tokio::test]
async fn test_basic_validation_uses_default_canvas() {
    let f = fixture_with(TemplateValidator::basic(), MockObjectStorage::new());
    let record = f
        .repository
        .upload(&png_bytes(1000, 700), "Wisuda", "admin-01")
        .await
        .unwrap();

    assert_eq!((record.width, record.height), (932, 661));
}

#[tokio::test]
async fn test_rejected_upload_stores_nothing() {
    let f = fixture();
    let err = f
        .repository
        .upload(&png_bytes(600, 900), "Portrait", "admin-01")
        .await
        .unwrap_err();

    assert!(matches!(err, TemplateError::Upload(_)));
    assert_eq!(f.storage.file_count().await, 0);
    assert_eq!(f.store.len().await, 0);
}

#[tokio::test]
async fn test_storage_failure_leaves_no_record() {
    let f = fixture_with(TemplateValidator::new(), MockObjectStorage::new().failing_store());
    let err = f
        .repository
        .upload(&png_bytes(1000, 700), "Wisuda", "admin-01")
        .await
        .unwrap_err();

    assert!(matches!(err, TemplateError::Storage(_)));
    assert_eq!(f.store.len().await, 0);
}

#[tokio::test]
async fn test_at_most_one_active_template() {
    let f = fixture();
    let mut ids = Vec::new();
    for i in 0..4 {
        let record = f
            .repository
            .upload(&png_bytes(1000, 700), &format!("T{}", i), "admin-01")
            .await
            .unwrap();
        ids.push(record.id);
        assert_eq!(f.store.active_count().await, 1);
    }

    f.repository.activate(ids[1]).await.unwrap();
    assert_eq!(f.store.active_count().await, 1);

    f.repository.deactivate(ids[1]).await.unwrap();
    assert_eq!(f.store.active_count().await, 0);

    f.repository.activate(ids[2]).await.unwrap();
    assert_eq!(f.store.active_count().await, 1);
}

#[tokio::test]
async fn test_activate_is_idempotent() {
    let f = fixture();
    let a = f
        .repository
        .upload(&png_bytes(1200, 800), "A", "admin-01")
        .await
        .unwrap();
    f.repository
        .upload(&png_bytes(1200, 800), "B", "admin-01")
        .await
        .unwrap();

    f.repository.activate(a.id).await.unwrap();
    f.repository.activate(a.id).await.unwrap();

    let active = f.repository.get_active().await.unwrap().unwrap();
    assert_eq!(active.id, a.id);
    assert_eq!(f.store.active_count().await, 1);
}

#[tokio::test]
async fn test_deactivate_inactive_is_invalid_state() {
    let f = fixture();
    let record = f
        .repository
        .upload(&png_bytes(1000, 700), "A", "admin-01")
        .await
        .unwrap();
    f.repository.deactivate(record.id).await.unwrap();

    match f.repository.deactivate(record.id).await {
        Err(TemplateError::InvalidState(reason)) => assert_eq!(reason, "already inactive"),
        other => panic!("expected InvalidState, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let f = fixture();
    let id = uuid::Uuid::new_v4();
    assert!(matches!(
        f.repository.activate(id).await,
        Err(TemplateError::NotFound(_))
    ));
    assert!(matches!(
        f.repository.deactivate(id).await,
        Err(TemplateError::NotFound(_))
    ));
    assert!(matches!(
        f.repository.delete(id).await,
        Err(TemplateError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_blob_delete_failure_does_not_block_delete() {
    let f = fixture();
    let a = f
        .repository
        .upload(&png_bytes(1000, 700), "A", "admin-01")
        .await
        .unwrap();
    f.repository
        .upload(&png_bytes(1000, 700), "B", "admin-01")
        .await
        .unwrap();

    f.storage.set_fail_delete(true);
    f.repository.delete(a.id).await.unwrap();
    assert!(f.repository.get(a.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_upload_then_render_end_to_end() {
    let f = fixture();
    let reports = ReportService::new(
        f.repository.clone(),
        f.storage.clone(),
        SchoolProfile::default(),
    );

    let a = f
        .repository
        .upload(&png_bytes(1200, 800), "Template A", "admin-01")
        .await
        .unwrap();
    assert!(f.repository.get_active().await.unwrap().unwrap().id == a.id);

    let b = f
        .repository
        .upload(&jpeg_bytes(1000, 700), "Template B", "admin-01")
        .await
        .unwrap();
    assert_eq!((b.width, b.height), (1000, 700));
    assert!(b.storage_key.ends_with(".jpg"));
    assert!(!f.repository.get(a.id).await.unwrap().unwrap().is_active);
    assert!(f.repository.get(b.id).await.unwrap().unwrap().is_active);

    f.repository.delete(a.id).await.unwrap();
    assert!(!f.storage.has_file(&a.storage_key).await);

    match f.repository.delete(b.id).await {
        Err(TemplateError::InvalidState(reason)) => {
            assert_eq!(reason, "cannot delete active template")
        }
        other => panic!("expected InvalidState, got {:?}", other),
    }

    let document = reports
        .render(&certificate_request(), &RenderOptions::default())
        .await
        .unwrap();
    assert!(document.pdf.starts_with(b"%PDF"));
    assert_eq!(document.filename, "Sertifikat_Zaid_bin_Tsabit.pdf");
    assert_eq!(f.storage.fetches().await, vec![b.storage_key.clone()]);

    let pdf = lopdf::Document::load_mem(&document.pdf).unwrap();
    assert_eq!(pdf.get_pages().len(), 1);

    f.repository.deactivate(b.id).await.unwrap();
    assert!(f.repository.get_active().await.unwrap().is_none());

    let err = reports
        .render(&certificate_request(), &RenderOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RenderError::NoActiveTemplate));
    assert_eq!(err.to_string(), "no active template");
}

#[tokio::test]
async fn test_unreachable_template_fails_render() {
    let f = fixture();
    let reports = ReportService::new(
        f.repository.clone(),
        f.storage.clone(),
        SchoolProfile::default(),
    );
    let record = f
        .repository
        .upload(&png_bytes(1000, 700), "A", "admin-01")
        .await
        .unwrap();

    // Blob vanished behind the repository's back.
    f.storage.delete(&record.storage_key).await.unwrap();

    let err = reports
        .render(&certificate_request(), &RenderOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RenderError::AssetUnreachable { .. }));
}

#[tokio::test]
async fn test_certificate_carries_school_masthead() {
    let f = fixture();
    let school = SchoolProfile {
        name: "Pesantren Nurul Huda".into(),
        address: "Jl. Kenanga No. 7, Bogor".into(),
        ..SchoolProfile::default()
    };
    let reports = ReportService::new(f.repository.clone(), f.storage.clone(), school);
    f.repository
        .upload(&png_bytes(1200, 800), "Template A", "admin-01")
        .await
        .unwrap();

    let document = reports
        .render(&certificate_request(), &RenderOptions::default())
        .await
        .unwrap();

    let mut pdf = lopdf::Document::load_mem(&document.pdf).unwrap();
    pdf.decompress();
    let pages = pdf.get_pages();
    assert_eq!(pages.len(), 1);
    let page_id = *pages.values().next().unwrap();
    let content = pdf.get_page_content(page_id).unwrap();
    let has = |needle: &[u8]| content.windows(needle.len()).any(|w| w == needle);

    assert!(has(b"(PESANTREN NURUL HUDA)"));
    assert!(has(b"(Jl. Kenanga No. 7, Bogor)"));
    assert!(has(b"(SERTIFIKAT TAHFIDZ AL-QUR'AN)"));
}
