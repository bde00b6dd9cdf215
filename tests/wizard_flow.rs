//! End-to-end tests for the onboarding wizard.
//!
//! Each test wires a manager to the mock backend (with latencies scaled down)
//! and either in-memory or on-disk session storage, then drives it the way the
//! step views would.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;

use tailor_onboarding::api::{DraftApi, FileUpload, MockConfig, MockDraftApi};
use tailor_onboarding::error::{ApiError, Error};
use tailor_onboarding::onboarding::{
    AutosaveOutcome, Autosaver, FileStorage, IdSide, MemoryStorage, NavigationController,
    OnboardingManager, OnboardingSession, SessionStorage, StepKey,
};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const KEY: &str = "tailor-onboarding";

fn mock(latency_scale: f64) -> Arc<MockDraftApi> {
    Arc::new(MockDraftApi::new(MockConfig {
        latency_scale,
        failure_rate: 0.0,
    }))
}

fn png(name: &str) -> FileUpload {
    FileUpload::new(name, "image/png", vec![9; 256])
}

/// Fill every step with data that passes its schema.
async fn fill_every_step(manager: &OnboardingManager) {
    let edits = [
        (
            StepKey::BasicInfo,
            json!({
                "fullName": "Meera Iyer",
                "shopName": "Meera Boutique",
                "phone": "9812345670",
                "email": "meera@example.com"
            }),
        ),
        (
            StepKey::Location,
            json!({
                "address1": "42 Temple Road, Mylapore",
                "city": "Chennai",
                "pincode": "600004"
            }),
        ),
        (StepKey::Specialties, json!({ "specialties": ["Blouse", "Lehenga"] })),
        (
            StepKey::Experience,
            json!({ "yearsOfExperience": 12, "maxOrdersPerWeek": 10, "maxOrdersPerMonth": 40 }),
        ),
        (
            StepKey::ServiceDetails,
            json!({ "priceMin": 300, "priceMax": 2500, "turnaroundTime": 5, "homePickup": true }),
        ),
        (
            StepKey::Payout,
            json!({
                "paymentMethod": "bank",
                "accountHolderName": "Meera Iyer",
                "bankName": "State Bank",
                "accountNumber": "123456789012",
                "ifscCode": "SBIN0001234"
            }),
        ),
        (StepKey::Review, json!({ "acceptTerms": true })),
    ];
    for (step, partial) in edits {
        manager.update_form_data(step, &partial).await.unwrap();
    }

    manager
        .upload_portfolio_images(vec![png("a.png"), png("b.png"), png("c.png")])
        .await
        .unwrap();
    manager
        .upload_id_image(IdSide::Front, png("front.png"))
        .await
        .unwrap();
    manager
        .upload_id_image(IdSide::Back, png("back.png"))
        .await
        .unwrap();
}

#[tokio::test]
async fn create_draft_then_save_location_echoes_data() {
    timeout(TEST_TIMEOUT, async {
        let api = mock(0.0);
        let draft = api.create_draft(&json!({})).await.unwrap();

        let data = json!({
            "address1": "42 Temple Road, Mylapore",
            "city": "Chennai",
            "pincode": "600004"
        });
        let saved = api
            .save_draft(&draft.id, StepKey::Location, &data)
            .await
            .unwrap();
        assert_eq!(saved.step_key, StepKey::Location);
        assert_eq!(saved.step_data, data);

        let fetched = api.get_draft(&draft.id).await.unwrap();
        assert_eq!(fetched.data["location"], data);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn full_wizard_submits() {
    timeout(TEST_TIMEOUT, async {
        let api = mock(0.0);
        let manager = Arc::new(OnboardingManager::new(
            Arc::new(MemoryStorage::new()),
            api.clone(),
            KEY,
        ));
        let nav = NavigationController::new(manager.clone());

        fill_every_step(&manager).await;
        for step in StepKey::ALL {
            assert!(manager.is_step_valid(step).await, "{step} should be valid");
            manager.save_step(step).await.unwrap();
            nav.next().await;
        }
        assert_eq!(manager.current_step().await, 9);
        assert_eq!(manager.progress().await, 100.0);
        assert_eq!(api.drafts_created(), 1);

        let receipt = manager.submit().await.unwrap();
        assert!(receipt.message.contains("submitted successfully"));
        assert_eq!(receipt.draft_id, manager.draft_id().await);
        assert!(!manager.is_submitting().await);

        let remote = manager.fetch_draft().await.unwrap().unwrap();
        assert_eq!(remote.data["basicInfo"]["whatsappNumber"], "9812345670");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn stale_autosave_result_is_discarded() {
    timeout(TEST_TIMEOUT, async {
        // Draft creation plus save take ~90ms, longer than the gap below.
        let api = mock(0.05);
        let manager = Arc::new(OnboardingManager::new(
            Arc::new(MemoryStorage::new()),
            api.clone(),
            KEY,
        ));
        fill_every_step(&manager).await;
        let saver = Autosaver::new(manager.clone(), Duration::from_millis(10));

        let first = saver
            .field_changed(StepKey::Location, &json!({ "city": "Madurai" }))
            .await
            .unwrap();
        // Let the first save reach the backend before editing again.
        tokio::time::sleep(Duration::from_millis(30)).await;
        let second = saver
            .field_changed(StepKey::Location, &json!({ "city": "Coimbatore" }))
            .await
            .unwrap();

        assert_eq!(first.await.unwrap(), AutosaveOutcome::Stale);
        match second.await.unwrap() {
            AutosaveOutcome::Saved(saved) => assert_eq!(saved.step_data["city"], "Coimbatore"),
            other => panic!("expected the newer save to apply, got {other:?}"),
        }
        assert_eq!(api.saves(), 2);
        assert_eq!(api.drafts_created(), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn concurrent_first_saves_share_one_draft() {
    timeout(TEST_TIMEOUT, async {
        let api = mock(0.02);
        let manager = Arc::new(OnboardingManager::new(
            Arc::new(MemoryStorage::new()),
            api.clone(),
            KEY,
        ));
        fill_every_step(&manager).await;

        let saves = StepKey::ALL.map(|step| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.save_step(step).await })
        });
        let mut ids = Vec::new();
        for handle in saves {
            ids.push(handle.await.unwrap().unwrap().id);
        }

        assert_eq!(api.drafts_created(), 1);
        let draft_id = manager.draft_id().await.unwrap();
        assert!(ids.iter().all(|id| *id == draft_id));
        assert!(!manager.is_saving().await);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn session_survives_restart() {
    timeout(TEST_TIMEOUT, async {
        let dir = tempfile::tempdir().unwrap();
        let api = mock(0.0);

        let draft_id = {
            let manager = OnboardingManager::new(
                Arc::new(FileStorage::new(dir.path())),
                api.clone(),
                KEY,
            );
            fill_every_step(&manager).await;
            manager.set_current_step(5).await;
            manager.save_step(StepKey::Location).await.unwrap();
            manager.draft_id().await.unwrap()
        };

        let manager = OnboardingManager::new(Arc::new(FileStorage::new(dir.path())), api, KEY);
        assert!(manager.restore().await);
        let session = manager.snapshot().await;
        assert_eq!(session.current_step(), 5);
        assert_eq!(session.draft_id(), Some(draft_id.as_str()));
        assert_eq!(session.form_data().location.city, "Chennai");
        assert_eq!(session.form_data().portfolio.portfolio_images.len(), 3);
        assert!(!session.is_saving());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn failed_submit_can_be_retried() {
    timeout(TEST_TIMEOUT, async {
        let api = mock(0.0);
        let manager = OnboardingManager::new(Arc::new(MemoryStorage::new()), api.clone(), KEY);
        fill_every_step(&manager).await;

        api.set_offline(true);
        let err = manager.submit().await.unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::Transient { .. })));
        assert!(!manager.is_submitting().await);

        api.set_offline(false);
        assert!(manager.submit().await.is_ok());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn start_over_discards_everything() {
    timeout(TEST_TIMEOUT, async {
        let storage = Arc::new(MemoryStorage::new());
        let manager = OnboardingManager::new(storage.clone(), mock(0.0), KEY);
        fill_every_step(&manager).await;
        manager.save_step(StepKey::BasicInfo).await.unwrap();
        manager.set_current_step(8).await;

        manager.start_over().await;

        let stored = storage.load(KEY).await.unwrap().unwrap();
        assert_eq!(stored, OnboardingSession::default());
        assert!(manager.draft_id().await.is_none());
        assert_eq!(manager.current_step().await, 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn route_sync_drives_the_store() {
    timeout(TEST_TIMEOUT, async {
        let storage = Arc::new(MemoryStorage::new());
        let manager = Arc::new(OnboardingManager::new(storage.clone(), mock(0.0), KEY));
        let nav = NavigationController::new(manager.clone());

        nav.navigate_to("/onboarding/service-details").await;
        assert_eq!(storage.load(KEY).await.unwrap().unwrap().current_step(), 6);

        assert_eq!(nav.navigate_to("/not-a-page").await, "/onboarding/basic-info");
        assert_eq!(manager.current_step().await, 1);
    })
    .await
    .expect("test timed out");
}
