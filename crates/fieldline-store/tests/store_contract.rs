use fieldline_model::{
    ClientRecord, Company, CompanyId, DocumentId, Email, Expense, Invoice, InvoiceStatus, Quote,
    QuoteItem, QuoteStatus, Role, UserAccount,
};
use fieldline_store::{Store, StoreError};

fn day(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn user(company: &CompanyId, email: &str, role: Role) -> UserAccount {
    UserAccount::new(
        company.clone(),
        Email::parse(email).unwrap(),
        "Somebody",
        role,
        "salt$digest".to_string(),
    )
    .unwrap()
}

#[tokio::test]
async fn client_crud_round_trip() {
    let store = Store::open_in_memory().await.unwrap();
    let company = CompanyId::generate();

    let mut client = ClientRecord::new(company.clone(), "Joao Pereira").unwrap();
    client.phone = Some("+351 912 345 678".to_string());
    store.put_client(&client).await.unwrap();

    let fetched = store.get_client(&company, &client.id).await.unwrap();
    assert_eq!(fetched, client);

    client.notes = Some("prefers morning visits".to_string());
    client.touch();
    store.put_client(&client).await.unwrap();
    let fetched = store.get_client(&company, &client.id).await.unwrap();
    assert_eq!(fetched.notes.as_deref(), Some("prefers morning visits"));

    store.delete_client(&company, &client.id).await.unwrap();
    assert_eq!(
        store.get_client(&company, &client.id).await.unwrap_err(),
        StoreError::NotFound("client")
    );
}

#[tokio::test]
async fn tenant_scope_hides_other_companies() {
    let store = Store::open_in_memory().await.unwrap();
    let company_a = CompanyId::generate();
    let company_b = CompanyId::generate();

    let client = ClientRecord::new(company_a.clone(), "Maria").unwrap();
    store.put_client(&client).await.unwrap();

    assert_eq!(
        store.get_client(&company_b, &client.id).await.unwrap_err(),
        StoreError::NotFound("client")
    );
    assert!(store.list_clients(&company_b).await.unwrap().is_empty());
    assert_eq!(
        store.delete_client(&company_b, &client.id).await.unwrap_err(),
        StoreError::NotFound("client")
    );

    // Still present for its own tenant.
    assert_eq!(store.list_clients(&company_a).await.unwrap().len(), 1);
}

#[tokio::test]
async fn user_email_is_globally_unique() {
    let store = Store::open_in_memory().await.unwrap();
    let company_a = CompanyId::generate();
    let company_b = CompanyId::generate();

    store
        .put_user(&user(&company_a, "ana@example.com", Role::Owner))
        .await
        .unwrap();

    // Same address in another tenant still collides.
    let err = store
        .put_user(&user(&company_b, "ana@example.com", Role::Owner))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::EmailExists);

    // Re-writing the same account (same id) is a plain update.
    let mut existing = store
        .find_user_by_email(&Email::parse("ana@example.com").unwrap())
        .await
        .unwrap()
        .unwrap();
    existing.display_name = "Ana Silva".to_string();
    existing.touch();
    store.put_user(&existing).await.unwrap();
    let refreshed = store
        .find_user_by_email(&Email::parse("ana@example.com").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.display_name, "Ana Silva");
}

#[tokio::test]
async fn token_hash_lookup_resolves_the_account() {
    let store = Store::open_in_memory().await.unwrap();
    let company = CompanyId::generate();

    let mut u = user(&company, "tech@example.com", Role::Technician);
    u.session_token_hash = Some("deadbeef".to_string());
    store.put_user(&u).await.unwrap();

    let found = store.find_user_by_token_hash("deadbeef").await.unwrap();
    assert_eq!(found.map(|f| f.id), Some(u.id));
    assert!(store
        .find_user_by_token_hash("cafebabe")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn quote_status_filter_narrows_the_list() {
    let store = Store::open_in_memory().await.unwrap();
    let company = CompanyId::generate();
    let client_id = DocumentId::generate();

    for status in [QuoteStatus::Draft, QuoteStatus::Sent, QuoteStatus::Approved] {
        let mut q = Quote::new(
            company.clone(),
            client_id.clone(),
            "Job",
            vec![QuoteItem {
                description: "Pane".to_string(),
                quantity: 1,
                unit_price_cents: 10_000,
            }],
        )
        .unwrap();
        q.status = status;
        store.put_quote(&q).await.unwrap();
    }

    assert_eq!(store.list_quotes(&company, None).await.unwrap().len(), 3);
    let approved = store.list_quotes(&company, Some("approved")).await.unwrap();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].status, QuoteStatus::Approved);
}

#[tokio::test]
async fn last_write_wins_on_the_same_document() {
    let store = Store::open_in_memory().await.unwrap();
    let company = CompanyId::generate();

    let mut invoice = Invoice::new(
        company.clone(),
        DocumentId::generate(),
        25_000,
        day(2024, 4, 1),
    )
    .unwrap();
    store.put_invoice(&invoice).await.unwrap();

    invoice.set_status(InvoiceStatus::Paid, day(2024, 4, 9));
    store.put_invoice(&invoice).await.unwrap();

    let fetched = store.get_invoice(&company, &invoice.id).await.unwrap();
    assert_eq!(fetched.status, InvoiceStatus::Paid);
    assert_eq!(fetched.paid_on, Some(day(2024, 4, 9)));
}

#[tokio::test]
async fn tenant_counts_cover_every_collection() {
    let store = Store::open_in_memory().await.unwrap();
    let company = CompanyId::generate();
    let client_id = DocumentId::generate();

    store
        .put_client(&ClientRecord::new(company.clone(), "C").unwrap())
        .await
        .unwrap();
    store
        .put_expense(
            &Expense::new(company.clone(), "fuel run", "fuel", 900, day(2024, 2, 2)).unwrap(),
        )
        .await
        .unwrap();
    store
        .put_invoice(&Invoice::new(company.clone(), client_id, 100, day(2024, 2, 2)).unwrap())
        .await
        .unwrap();
    store
        .put_user(&user(&company, "owner@example.com", Role::Owner))
        .await
        .unwrap();

    let counts = store.tenant_counts(&company).await.unwrap();
    assert_eq!(counts["clients"], 1);
    assert_eq!(counts["expenses"], 1);
    assert_eq!(counts["invoices"], 1);
    assert_eq!(counts["users"], 1);
    assert_eq!(counts["quotes"], 0);
    assert_eq!(counts["work_orders"], 0);
}

#[tokio::test]
async fn documents_survive_reopen_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fieldline.db");
    let company = Company::new("Vidros Silva").unwrap();

    {
        let store = Store::open(&path).await.unwrap();
        store.put_company(&company).await.unwrap();
    }

    let store = Store::open(&path).await.unwrap();
    let fetched = store.get_company(&company.id).await.unwrap();
    assert_eq!(fetched.name, "Vidros Silva");
}
