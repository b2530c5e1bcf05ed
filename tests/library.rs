mod common;

use std::sync::atomic::Ordering;

use audiobook_store::{
    dto::purchases::{DirectPurchaseRequest, SendLibraryRequest},
    error::AppError,
    models::{EmailStatus, EmailType, PurchaseStatus},
    services::{download_service, order_service, purchase_service},
    store,
};
use common::{BOOK_ID, BUYER, SentMail, TestApp, drive_link, token_from_url};

fn library_request(email: &str) -> SendLibraryRequest {
    SendLibraryRequest {
        email: email.into(),
    }
}

fn direct_request(book_id: &str) -> DirectPurchaseRequest {
    DirectPurchaseRequest {
        email: BUYER.into(),
        book_id: book_id.into(),
        book_title: "The Art of War".into(),
    }
}

#[tokio::test]
async fn library_for_unknown_email_is_not_found() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.buy_default_book().await?;

    let err = purchase_service::send_library(&app.state, library_request("nobody@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn pending_orders_are_not_part_of_the_library() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.place_order(BOOK_ID, BUYER, 100.0).await?;

    let err = purchase_service::send_library(&app.state, library_request(BUYER))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn library_regrants_access_and_lists_every_book() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.insert_book("B2", "The Art of War, Part 2", 5_000, Some(&drive_link("XYZ789")))
        .await?;
    app.buy_default_book().await?;
    let order_id = app.place_order("B2", BUYER, 50.0).await?;
    order_service::verify_payment(&app.state, app.signed_verify(&order_id, "pay_2", "B2", BUYER))
        .await?;

    let resp = purchase_service::send_library(&app.state, library_request("A@X.com"))
        .await?;
    assert_eq!(resp.data.expect("library").count, 2);

    let sent = app.mailer.sent.lock().unwrap().clone();
    let Some(SentMail::Library { email, items }) = sent.last() else {
        panic!("expected a library email, got {sent:?}");
    };
    assert_eq!(email.as_str(), BUYER);
    let mut titles: Vec<_> = items.iter().map(|item| item.title.as_str()).collect();
    titles.sort();
    assert_eq!(titles, ["The Art of War", "The Art of War, Part 2"]);

    // Two grants from the purchases, two more from the re-send.
    assert_eq!(app.drive.grants.lock().unwrap().len(), 4);

    let completed = store::completed_purchases_for_email(&app.state.orm, BUYER).await?;
    for (purchase, _) in completed {
        let records = store::email_records_for_purchase(&app.state.orm, purchase.id).await?;
        let links = records
            .iter()
            .filter(|r| r.email_type == EmailType::DownloadLink)
            .count();
        assert_eq!(links, 2);
        assert!(records.iter().all(|r| r.email_type != EmailType::DownloadLink
            || r.status == EmailStatus::Sent));
    }
    Ok(())
}

#[tokio::test]
async fn library_skips_books_whose_grant_fails() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.buy_default_book().await?;
    app.drive.fail_grants.store(true, Ordering::SeqCst);

    let resp = purchase_service::send_library(&app.state, library_request(BUYER)).await?;
    assert_eq!(resp.data.expect("library").count, 0);

    let sent = app.mailer.sent.lock().unwrap().clone();
    assert!(matches!(sent.last(), Some(SentMail::Library { items, .. }) if items.is_empty()));
    Ok(())
}

#[tokio::test]
async fn library_mail_failure_is_recorded_and_reported() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.buy_default_book().await?;
    app.mailer.fail.store(true, Ordering::SeqCst);

    let err = purchase_service::send_library(&app.state, library_request(BUYER))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));

    let (purchase, _) = store::completed_purchases_for_email(&app.state.orm, BUYER)
        .await?
        .into_iter()
        .next()
        .expect("purchase");
    let records = store::email_records_for_purchase(&app.state.orm, purchase.id).await?;
    assert!(records.iter().any(|r| r.status == EmailStatus::Failed));
    Ok(())
}

#[tokio::test]
async fn direct_purchase_is_forbidden_by_default() -> anyhow::Result<()> {
    let app = TestApp::new().await?;

    let err = purchase_service::direct_purchase(&app.state, direct_request(BOOK_ID))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    assert!(app.drive.grants.lock().unwrap().is_empty());
    assert_eq!(app.mailer.attempts.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn direct_purchase_records_a_downloadable_purchase() -> anyhow::Result<()> {
    let app = TestApp::with_direct_purchase(true).await?;

    let resp = purchase_service::direct_purchase(&app.state, direct_request(BOOK_ID)).await?;
    let result = resp.data.expect("direct purchase");
    assert_eq!(result.notification, EmailStatus::Sent);

    let claims = app
        .state
        .tokens
        .verify(&token_from_url(&app.mailer.last_download_url().expect("link")))
        .expect("token");
    assert_eq!(claims.purchase_id, result.purchase_id);

    let purchase = store::find_completed_purchase(&app.state.orm, result.purchase_id, BUYER)
        .await?
        .expect("completed purchase");
    assert_eq!(purchase.status, PurchaseStatus::Completed);
    assert!(purchase.order_id.is_none());
    assert_eq!(purchase.amount, 10_000);

    download_service::open_download(&app.state, &claims, BOOK_ID).await?;
    Ok(())
}

#[tokio::test]
async fn direct_purchase_requires_a_usable_drive_link() -> anyhow::Result<()> {
    let app = TestApp::with_direct_purchase(true).await?;
    app.insert_book("NOLINK", "No Link", 100, None).await?;
    app.insert_book("BADLINK", "Bad Link", 100, Some("https://example.com/audio.mp3"))
        .await?;

    let missing = purchase_service::direct_purchase(&app.state, direct_request("NOLINK"))
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::NotFound(_)));

    let bad = purchase_service::direct_purchase(&app.state, direct_request("BADLINK"))
        .await
        .unwrap_err();
    assert!(matches!(bad, AppError::BadRequest(_)));

    let unknown = purchase_service::direct_purchase(&app.state, direct_request("NOPE"))
        .await
        .unwrap_err();
    assert!(matches!(unknown, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn empty_library_email_is_still_recorded() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.buy_default_book().await?;
    app.drive.fail_grants.store(true, Ordering::SeqCst);
    app.mailer.fail.store(true, Ordering::SeqCst);

    let err = purchase_service::send_library(&app.state, library_request(BUYER))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));

    let (purchase, _) = store::completed_purchases_for_email(&app.state.orm, BUYER)
        .await?
        .into_iter()
        .next()
        .expect("purchase");
    let records = store::email_records_for_purchase(&app.state.orm, purchase.id).await?;
    let failed = records
        .iter()
        .filter(|r| r.email_type == EmailType::DownloadLink && r.status == EmailStatus::Failed)
        .count();
    assert_eq!(failed, 1);
    Ok(())
}

#[tokio::test]
async fn failed_direct_grant_leaves_no_purchase() -> anyhow::Result<()> {
    let app = TestApp::with_direct_purchase(true).await?;
    app.drive.fail_grants.store(true, Ordering::SeqCst);

    let err = purchase_service::direct_purchase(&app.state, direct_request(BOOK_ID))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Provider(_)));
    assert_eq!(app.mailer.attempts.load(Ordering::SeqCst), 0);
    assert!(
        store::completed_purchases_for_email(&app.state.orm, BUYER)
            .await?
            .is_empty()
    );

    app.drive.fail_grants.store(false, Ordering::SeqCst);
    let err = purchase_service::send_library(&app.state, library_request(BUYER))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}
