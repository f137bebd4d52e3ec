//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the registry and drive the
//! search → project → procedure → document pipeline end-to-end.

use std::path::Path;
use tempfile::TempDir;
use via_harvest::config::Config;
use via_harvest::crawler::{Coordinator, Session, StopReason};
use via_harvest::model::{DocumentRef, ProcedureRef};
use via_harvest::{DownloadResult, HarvestError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/it-IT/Ricerca/ViaLibera";

/// Creates a test configuration pointed at the mock server, without delays
fn create_test_config(server: &MockServer, download_dir: &Path) -> Config {
    let mut config = Config::default();
    config.site.base_url = server.uri();
    config.crawler.request_delay_ms = 0;
    config.output.download_dir = download_dir.display().to_string();
    config
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(format!("<html><body>{}</body></html>", body))
}

async fn mount_warm_up(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("home"))
        .mount(server)
        .await;
}

async fn mount_search_page(server: &MockServer, keyword: &str, page: u32, body: &str) {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("Testo", keyword))
        .and(query_param("t", "o"))
        .and(query_param("p", page.to_string().as_str()))
        .respond_with(html_page(body))
        .mount(server)
        .await;
}

async fn mount_html(server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html_page(body))
        .mount(server)
        .await;
}

async fn mount_document(server: &MockServer, doc_path: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(doc_path))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, request_path: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == request_path)
        .collect()
}

/// One project with one procedure listing the given document links
async fn mount_single_project(server: &MockServer, keyword: &str, documents: &str) {
    mount_search_page(
        server,
        keyword,
        1,
        r#"<a href="/it-IT/Oggetti/Info/1">Progetto 1</a>"#,
    )
    .await;
    mount_html(
        server,
        "/it-IT/Oggetti/Info/1",
        r#"<a href="/it-IT/Oggetti/Documentazione/1/10">Procedura VIA</a>"#,
    )
    .await;
    mount_html(server, "/it-IT/Oggetti/Documentazione/1/10", documents).await;
}

#[tokio::test]
async fn test_search_stops_on_empty_page() {
    let server = MockServer::start().await;
    mount_warm_up(&server).await;

    mount_search_page(
        &server,
        "autostrada",
        1,
        r#"<a href="/it-IT/Oggetti/Info/100">A1 Milano-Napoli</a>
           <a href="/it-IT/Oggetti/Info/200">A14 Bologna-Taranto</a>
           <a href="/it-IT/Ricerca/ViaLibera?Testo=autostrada&t=o&p=2">2</a>"#,
    )
    .await;
    // The empty page still advertises a next page; emptiness wins
    mount_search_page(
        &server,
        "autostrada",
        2,
        r#"<p>Nessun risultato</p><a href="?Testo=autostrada&t=o&p=3">3</a>"#,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());
    let coordinator = Coordinator::new(config.clone()).unwrap();
    let session = Session::open(&config).await.unwrap();

    let outcome = coordinator
        .get_projects(&session, "autostrada", None)
        .await
        .unwrap();

    let urls: Vec<String> = outcome.items.iter().map(|p| p.url.clone()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/it-IT/Oggetti/Info/100", server.uri()),
            format!("{}/it-IT/Oggetti/Info/200", server.uri()),
        ]
    );
    assert_eq!(outcome.stop, StopReason::EmptyPage { page: 2 });
    assert_eq!(requests_to(&server, SEARCH_PATH).await.len(), 2);
}

#[tokio::test]
async fn test_procedure_listing_without_next_page() {
    let server = MockServer::start().await;
    mount_warm_up(&server).await;

    mount_html(
        &server,
        "/it-IT/Oggetti/Documentazione/1/10",
        r#"<table>
             <tr><th>Documento</th><th>Tipo</th><th>Data</th></tr>
             <tr><td><a href="/File/Documento/101">Elenco elaborati</a></td><td>Documento</td><td>01/02/2022</td></tr>
             <tr><td><a href="/allegati/sintesi.pdf">Sintesi non tecnica</a></td><td>PDF</td><td>03/02/2022</td></tr>
             <tr><td><a href="/allegati/osservazioni.docx">Osservazioni</a></td><td>Word</td><td>04/02/2022</td></tr>
           </table>
           <a href="/it-IT/Oggetti/Info/1">Torna al progetto</a>"#,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());
    let coordinator = Coordinator::new(config.clone()).unwrap();
    let session = Session::open(&config).await.unwrap();

    let procedure = ProcedureRef {
        url: format!("{}/it-IT/Oggetti/Documentazione/1/10", server.uri()),
        project_url: format!("{}/it-IT/Oggetti/Info/1", server.uri()),
    };
    let outcome = coordinator.get_documents(&session, &procedure).await;

    assert_eq!(outcome.items.len(), 3);
    assert_eq!(outcome.stop, StopReason::NoNextPage { page: 1 });

    let extensions: Vec<&str> = outcome.items.iter().map(|d| d.extension.as_str()).collect();
    assert_eq!(extensions, vec!["pdf", "pdf", "docx"]);
    assert_eq!(outcome.items[1].title, "Sintesi non tecnica");
    assert_eq!(outcome.items[2].date, "04/02/2022");

    let listing_requests = requests_to(&server, "/it-IT/Oggetti/Documentazione/1/10").await;
    assert_eq!(listing_requests.len(), 1);
    assert!(listing_requests[0].url.query().is_none());
}

#[tokio::test]
async fn test_procedure_listing_follows_pagina() {
    let server = MockServer::start().await;
    mount_warm_up(&server).await;

    Mock::given(method("GET"))
        .and(path("/it-IT/Oggetti/Documentazione/1/10"))
        .and(query_param("pagina", "2"))
        .respond_with(html_page(r#"<a href="/File/Documento/103">Tavola 3</a>"#))
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/it-IT/Oggetti/Documentazione/1/10",
        r#"<a href="/File/Documento/101">Tavola 1</a>
           <a href="/File/Documento/102">Tavola 2</a>
           <a href="?pagina=2">Successiva</a>"#,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());
    let coordinator = Coordinator::new(config.clone()).unwrap();
    let session = Session::open(&config).await.unwrap();

    let procedure = ProcedureRef {
        url: format!("{}/it-IT/Oggetti/Documentazione/1/10", server.uri()),
        project_url: format!("{}/it-IT/Oggetti/Info/1", server.uri()),
    };
    let outcome = coordinator.get_documents(&session, &procedure).await;

    let titles: Vec<&str> = outcome.items.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["Tavola 1", "Tavola 2", "Tavola 3"]);
    assert_eq!(outcome.pages_fetched, 2);
}

#[tokio::test]
async fn test_run_crawl_downloads_and_skips_existing() {
    let server = MockServer::start().await;
    mount_warm_up(&server).await;
    mount_single_project(
        &server,
        "diga",
        r#"<a href="/File/Documento/101">Relazione</a>
           <a href="/File/Documento/102">Tavola</a>"#,
    )
    .await;
    mount_document(
        &server,
        "/File/Documento/101",
        ResponseTemplate::new(200)
            .insert_header("content-disposition", r#"attachment; filename="report.docx""#)
            .set_body_bytes(b"docx bytes".to_vec()),
    )
    .await;
    mount_document(
        &server,
        "/File/Documento/102",
        ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::new(create_test_config(&server, dir.path())).unwrap();

    let first = coordinator.run_crawl("diga", None).await.unwrap();
    assert_eq!(first.results.len(), 2);
    assert!(first.results.iter().all(DownloadResult::is_saved));
    assert_eq!(first.stats.projects_processed, 1);
    assert_eq!(first.stats.procedures_found, 1);
    assert_eq!(first.stats.documents_found, 2);
    assert_eq!(first.stats.bytes_written, 18);

    assert_eq!(
        std::fs::read(dir.path().join("report.docx")).unwrap(),
        b"docx bytes"
    );
    assert_eq!(std::fs::read(dir.path().join("102.pdf")).unwrap(), b"%PDF-1.4");
    assert!(!dir.path().join("101.pdf").exists());

    let second = coordinator.run_crawl("diga", None).await.unwrap();
    assert!(second.results.iter().all(DownloadResult::is_skipped));
    assert_eq!(second.stats.downloads_skipped, 2);
    assert_eq!(
        std::fs::read(dir.path().join("report.docx")).unwrap(),
        b"docx bytes"
    );
}

#[tokio::test]
async fn test_failing_project_is_skipped() {
    let server = MockServer::start().await;
    mount_warm_up(&server).await;

    mount_search_page(
        &server,
        "eolico",
        1,
        r#"<a href="/it-IT/Oggetti/Info/1">Parco eolico guasto</a>
           <a href="/it-IT/Oggetti/Info/2">Parco eolico</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/it-IT/Oggetti/Info/1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/it-IT/Oggetti/Info/2",
        r#"<a href="/it-IT/Oggetti/Documentazione/2/20">Procedura</a>"#,
    )
    .await;
    mount_html(
        &server,
        "/it-IT/Oggetti/Documentazione/2/20",
        r#"<a href="/File/Documento/201">Studio</a>"#,
    )
    .await;
    mount_document(
        &server,
        "/File/Documento/201",
        ResponseTemplate::new(200).set_body_bytes(b"studio".to_vec()),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::new(create_test_config(&server, dir.path())).unwrap();

    let report = coordinator.run_crawl("eolico", None).await.unwrap();

    assert_eq!(report.stats.projects_found, 2);
    assert_eq!(report.stats.projects_failed, 1);
    assert_eq!(report.stats.projects_processed, 1);
    assert_eq!(report.stats.downloads_saved, 1);
    assert!(dir.path().join("201.pdf").exists());
}

#[tokio::test]
async fn test_failed_download_leaves_no_file() {
    let server = MockServer::start().await;
    mount_warm_up(&server).await;
    mount_single_project(
        &server,
        "cava",
        r#"<a href="/File/Documento/301">Rotto</a>
           <a href="/File/Documento/302">Integro</a>"#,
    )
    .await;
    mount_document(&server, "/File/Documento/301", ResponseTemplate::new(500)).await;
    mount_document(
        &server,
        "/File/Documento/302",
        ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::new(create_test_config(&server, dir.path())).unwrap();

    let report = coordinator.run_crawl("cava", None).await.unwrap();

    assert!(report.results[0].is_failed());
    assert!(report.results[1].is_saved());
    assert_eq!(report.stats.downloads_failed, 1);

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["302.pdf".to_string()]);
}

#[tokio::test]
async fn test_max_projects_limits_crawl() {
    let server = MockServer::start().await;
    mount_warm_up(&server).await;

    mount_search_page(
        &server,
        "porto",
        1,
        r#"<a href="/it-IT/Oggetti/Info/1">Porto 1</a>
           <a href="/it-IT/Oggetti/Info/2">Porto 2</a>
           <a href="/it-IT/Oggetti/Info/3">Porto 3</a>"#,
    )
    .await;
    mount_html(&server, "/it-IT/Oggetti/Info/1", "<p>Nessuna procedura</p>").await;

    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::new(create_test_config(&server, dir.path())).unwrap();

    let discovery = coordinator.discover("porto", Some(1)).await.unwrap();

    assert_eq!(discovery.projects.len(), 1);
    assert!(requests_to(&server, "/it-IT/Oggetti/Info/2").await.is_empty());
    assert!(requests_to(&server, "/it-IT/Oggetti/Info/3").await.is_empty());
}

#[tokio::test]
async fn test_discover_does_not_download() {
    let server = MockServer::start().await;
    mount_warm_up(&server).await;
    mount_single_project(
        &server,
        "metanodotto",
        r#"<ul><li><a href="/File/Documento/401">Planimetria</a><span>2,1 MB</span></li></ul>"#,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::new(create_test_config(&server, dir.path())).unwrap();

    let discovery = coordinator.discover("metanodotto", None).await.unwrap();

    let documents: Vec<&DocumentRef> = discovery.documents().collect();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].title, "Planimetria");
    assert_eq!(documents[0].size, "2,1 MB");
    assert!(requests_to(&server, "/File/Documento/401").await.is_empty());
    assert!(!dir.path().exists() || std::fs::read_dir(dir.path()).unwrap().count() == 0);
}

#[tokio::test]
async fn test_deduplication_is_optional() {
    let server = MockServer::start().await;
    mount_warm_up(&server).await;

    mount_search_page(
        &server,
        "ponte",
        1,
        r#"<a href="/it-IT/Oggetti/Info/1">Ponte</a>"#,
    )
    .await;
    mount_html(
        &server,
        "/it-IT/Oggetti/Info/1",
        r#"<a href="/it-IT/Oggetti/Documentazione/1/10">Fase 1</a>
           <a href="/it-IT/Oggetti/Documentazione/1/11">Fase 2</a>"#,
    )
    .await;
    let shared = r#"<a href="/File/Documento/501">Relazione comune</a>"#;
    mount_html(&server, "/it-IT/Oggetti/Documentazione/1/10", shared).await;
    mount_html(&server, "/it-IT/Oggetti/Documentazione/1/11", shared).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path());

    let plain = Coordinator::new(config.clone()).unwrap();
    let discovery = plain.discover("ponte", None).await.unwrap();
    assert_eq!(discovery.document_count(), 2);
    assert_eq!(discovery.duplicates_skipped, 0);

    config.crawler.deduplicate_documents = true;
    let deduplicating = Coordinator::new(config).unwrap();
    let discovery = deduplicating.discover("ponte", None).await.unwrap();
    assert_eq!(discovery.document_count(), 1);
    assert_eq!(discovery.duplicates_skipped, 1);
}

#[tokio::test]
async fn test_empty_keyword_makes_no_requests() {
    let server = MockServer::start().await;
    mount_warm_up(&server).await;

    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::new(create_test_config(&server, dir.path())).unwrap();

    let result = coordinator.run_crawl("   ", None).await;

    assert!(matches!(result, Err(HarvestError::InvalidKeyword(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_session_sends_browser_headers_and_cookies() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "ASP.NET_SessionId=abc123; Path=/")
                .set_body_string("home"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(header("user-agent", "via-harvest-test/1.0"))
        .and(header("upgrade-insecure-requests", "1"))
        .and(header("cookie", "ASP.NET_SessionId=abc123"))
        .respond_with(html_page("<p>Nessun risultato</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path());
    config.http.user_agent = "via-harvest-test/1.0".to_string();
    let coordinator = Coordinator::new(config).unwrap();

    let discovery = coordinator.discover("strada", None).await.unwrap();
    assert!(discovery.projects.is_empty());
}

#[tokio::test]
async fn test_document_search_mode() {
    let server = MockServer::start().await;
    mount_warm_up(&server).await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("t", "d"))
        .and(query_param("p", "1"))
        .respond_with(html_page(
            r#"<a href="/File/Documento/601">Parere CTVIA</a>
               <a href="/it-IT/Oggetti/Info/6">Progetto</a>"#,
        ))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::new(create_test_config(&server, dir.path())).unwrap();

    let documents = coordinator.search_documents("parere").await.unwrap();

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].title, "Parere CTVIA");
    assert_eq!(documents[0].document_id(), Some("601"));
}

async fn mount_metadata(server: &MockServer, id: &str, title: &str) {
    Mock::given(method("HEAD"))
        .and(path(format!("/File/Documento/{}", id)))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/pdf"))
        .expect(1)
        .mount(server)
        .await;
    mount_html(
        server,
        &format!("/it-IT/Oggetti/MetadatoDocumento/{}", id),
        &format!(
            r#"<table>
                 <tr><td>Codice elaborato</td><td>AMB-REL-{id}</td></tr>
                 <tr><td>Documento</td><td>{title}</td></tr>
               </table>"#
        ),
    )
    .await;
}

#[tokio::test]
async fn test_describe_uses_head_and_metadata() {
    let server = MockServer::start().await;
    mount_warm_up(&server).await;
    mount_metadata(&server, "701", "Studio di impatto ambientale").await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());
    let coordinator = Coordinator::new(config.clone()).unwrap();
    let session = Session::open(&config).await.unwrap();

    let document = DocumentRef::new(format!("{}/File/Documento/701", server.uri()));
    let described = coordinator.describe(&session, &document).await;

    assert_eq!(described.title, "Studio di impatto ambientale");
    assert_eq!(described.doc_type, "PDF");
    assert_eq!(described.extension, "pdf");
    assert!(requests_to(&server, "/File/Documento/701")
        .await
        .iter()
        .all(|r| r.method.to_string() == "HEAD"));
}

#[tokio::test]
async fn test_describing_discovery_reuses_one_session() {
    let server = MockServer::start().await;
    mount_warm_up(&server).await;

    mount_search_page(
        &server,
        "eolico",
        1,
        r#"<a href="/it-IT/Oggetti/Info/1">Progetto 1</a>"#,
    )
    .await;
    mount_html(
        &server,
        "/it-IT/Oggetti/Info/1",
        r#"<a href="/it-IT/Oggetti/Documentazione/1/10">Procedura VIA</a>
           <a href="/it-IT/Oggetti/Documentazione/1/11">Procedura VAS</a>"#,
    )
    .await;
    mount_html(
        &server,
        "/it-IT/Oggetti/Documentazione/1/10",
        r#"<a href="/File/Documento/801">doc</a>"#,
    )
    .await;
    mount_html(
        &server,
        "/it-IT/Oggetti/Documentazione/1/11",
        r#"<a href="/File/Documento/802">doc</a>"#,
    )
    .await;
    mount_metadata(&server, "801", "Sintesi non tecnica").await;
    mount_metadata(&server, "802", "Parere di compatibilita").await;

    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::new(create_test_config(&server, dir.path()))
        .unwrap()
        .describing(true);

    let discovery = coordinator.discover("eolico", None).await.unwrap();

    let titles: Vec<&str> = discovery
        .documents()
        .map(|doc| doc.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Sintesi non tecnica", "Parere di compatibilita"]);
    assert_eq!(requests_to(&server, "/").await.len(), 1);
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_document_search_without_describe_skips_metadata() {
    let server = MockServer::start().await;
    mount_warm_up(&server).await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("t", "d"))
        .respond_with(html_page(r#"<a href="/File/Documento/901">Allegato</a>"#))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::new(create_test_config(&server, dir.path())).unwrap();

    let documents = coordinator.search_documents("allegato").await.unwrap();

    assert_eq!(documents[0].title, "Allegato");
    assert!(requests_to(&server, "/File/Documento/901").await.is_empty());
    assert!(requests_to(&server, "/it-IT/Oggetti/MetadatoDocumento/901")
        .await
        .is_empty());
}
