use axum::body::Body;
use axum::Router;
use chrono::Datelike;
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use question_bank::{open_state, router};

const BOUNDARY: &str = "question-bank-test-boundary";

struct TestApp {
    dir: TempDir,
    app: Router,
}

async fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(dir.path(), 1024 * 1024).await.unwrap();
    TestApp {
        app: router(state),
        dir,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::delete(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn upload(
        &self,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> (StatusCode, Value) {
        let mut body: Vec<u8> = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        let request = Request::post("/api/files")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Subject, system and a 10 marks section. Returns their ids.
    async fn scaffold(&self) -> (String, String, String) {
        let (status, subject) = self
            .json("POST", "/api/subjects", json!({ "name": "Pathology" }))
            .await;
        assert_eq!(status, StatusCode::OK, "{subject}");
        let subject_id = subject["data"]["id"].as_str().unwrap().to_string();
        let (status, system) = self
            .json(
                "POST",
                "/api/systems",
                json!({ "name": "Hematology", "subjectId": subject_id }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{system}");
        let system_id = system["data"]["id"].as_str().unwrap().to_string();
        let (status, section) = self
            .json(
                "POST",
                "/api/marks-sections",
                json!({ "marks": 10, "systemId": system_id }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{section}");
        let section_id = section["data"]["id"].as_str().unwrap().to_string();
        (subject_id, system_id, section_id)
    }

    async fn create_question(&self, title: &str, years: Value) -> String {
        let (subject_id, system_id, section_id) = self.scaffold().await;
        let (status, body) = self
            .json(
                "POST",
                "/api/questions",
                json!({
                    "title": title,
                    "subjectId": subject_id,
                    "systemId": system_id,
                    "marksSectionId": section_id,
                    "years": years,
                    "globalImportance": 0.9
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

fn recent_years(count: i32) -> Vec<String> {
    let current = chrono::Utc::now().year();
    (0..count).map(|offset| (current - offset).to_string()).collect()
}

#[tokio::test]
async fn question_score_is_computed_server_side() {
    let app = test_app().await;
    let (subject_id, system_id, section_id) = app.scaffold().await;
    let mut years = recent_years(5);
    years.push("1990".to_string());
    let (status, body) = app
        .json(
            "POST",
            "/api/questions",
            json!({
                "title": "Anemia classification",
                "subjectId": subject_id,
                "systemId": system_id,
                "marksSectionId": section_id,
                "years": years,
                "globalImportance": 0.9,
                "repeatCount": 42,
                "importanceScore": 1.0
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!("Question created successfully"));
    let question = &body["data"];
    assert_eq!(question["repeatCount"], json!(6));
    assert_eq!(question["importanceScore"], json!(0.82));
    assert_eq!(question["years"].as_array().unwrap().len(), 6);
    assert_eq!(question["subject"]["name"], json!("Pathology"));
    assert_eq!(question["marksSection"]["label"], json!("10 Markers"));
    assert_eq!(question["fileCount"], json!(0));
}

#[tokio::test]
async fn question_without_title_is_rejected() {
    let app = test_app().await;
    let (subject_id, system_id, section_id) = app.scaffold().await;
    let (status, body) = app
        .json(
            "POST",
            "/api/questions",
            json!({
                "title": "   ",
                "subjectId": subject_id,
                "systemId": system_id,
                "marksSectionId": section_id
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Question title is required"));

    let (status, body) = app
        .json(
            "POST",
            "/api/questions",
            json!({
                "title": "Orphan",
                "subjectId": subject_id,
                "systemId": system_id,
                "marksSectionId": "missing"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Marks section not found"));
}

#[tokio::test]
async fn duplicate_marks_in_system_conflicts() {
    let app = test_app().await;
    let (_, system_id, _) = app.scaffold().await;
    let (status, body) = app
        .json(
            "POST",
            "/api/marks-sections",
            json!({ "marks": 10, "systemId": system_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));

    let (_, listing) = app
        .get(&format!("/api/marks-sections?systemId={system_id}"))
        .await;
    assert_eq!(listing["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_subject_name_conflicts() {
    let app = test_app().await;
    app.scaffold().await;
    let (status, body) = app
        .json("POST", "/api/subjects", json!({ "name": "Pathology" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("Subject with this name already exists"));
}

#[tokio::test]
async fn system_order_defaults_to_next_slot() {
    let app = test_app().await;
    let (subject_id, first_system, _) = app.scaffold().await;
    let (_, second) = app
        .json(
            "POST",
            "/api/systems",
            json!({ "name": "Cardiology", "subjectId": subject_id }),
        )
        .await;
    assert_eq!(second["data"]["order"], json!(1));
    let (_, first) = app.get(&format!("/api/systems?id={first_system}")).await;
    assert_eq!(first["data"]["order"], json!(0));
    assert_eq!(first["data"]["marksSectionCount"], json!(1));
    assert_eq!(first["data"]["subject"]["id"], json!(subject_id));
}

#[tokio::test]
async fn partial_update_keeps_other_fields_and_rescores() {
    let app = test_app().await;
    let id = app
        .create_question("Leukemia", json!(["1990", "1991"]))
        .await;

    let (status, body) = app
        .json("PUT", "/api/questions", json!({ "id": id, "isBookmarked": true }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["title"], json!("Leukemia"));
    assert_eq!(body["data"]["isBookmarked"], json!(true));
    assert_eq!(body["data"]["repeatCount"], json!(2));
    assert_eq!(body["data"]["importanceScore"], json!(0.26));

    let (_, body) = app
        .json(
            "PUT",
            "/api/questions",
            json!({ "id": id, "years": recent_years(5), "globalImportance": 2.0 }),
        )
        .await;
    assert_eq!(body["data"]["repeatCount"], json!(5));
    assert_eq!(body["data"]["importanceScore"], json!(0.8));
    assert_eq!(body["data"]["isBookmarked"], json!(true));
}

#[tokio::test]
async fn questions_listing_filters_and_orders() {
    let app = test_app().await;
    let (subject_id, system_id, section_id) = app.scaffold().await;
    for (title, importance) in [("Alpha", 0.1), ("Beta", 0.9), ("Gamma", 0.5)] {
        app.json(
            "POST",
            "/api/questions",
            json!({
                "title": title,
                "description": format!("about {title}"),
                "subjectId": subject_id,
                "systemId": system_id,
                "marksSectionId": section_id,
                "globalImportance": importance
            }),
        )
        .await;
    }
    let (_, body) = app.get("/api/questions").await;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Beta", "Gamma", "Alpha"]);

    let (_, body) = app
        .get("/api/questions?orderBy=title&orderDir=asc&limit=2")
        .await;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Alpha", "Beta"]);

    let (_, body) = app.get("/api/questions?search=gamm").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = app.get("/api/featured?limit=1").await;
    assert_eq!(body["data"][0]["title"], json!("Beta"));

    let (_, body) = app.get("/api/subjects").await;
    assert_eq!(body["data"][0]["questionCount"], json!(3));
    assert_eq!(body["data"][0]["featuredQuestions"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn upload_tags_file_type_and_serves_content() {
    let app = test_app().await;
    let question_id = app.create_question("Slides", json!([])).await;

    let (status, body) = app
        .upload(
            &[("questionId", question_id.as_str())],
            Some(("Lecture.PPTX", b"pptx-bytes")),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["type"], json!("ppt"));
    assert_eq!(body["data"]["name"], json!("Lecture.PPTX"));
    assert_eq!(body["data"]["size"], json!(10));
    let file_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = app
        .upload(
            &[("questionId", question_id.as_str()), ("name", "Raw dump")],
            Some(("dump.bin", b"\x00\x01")),
        )
        .await;
    assert_eq!(body["data"]["type"], json!("other"));
    assert_eq!(body["data"]["name"], json!("Raw dump"));

    let response = app
        .app
        .clone()
        .oneshot(
            Request::get(format!("/api/files/content?id={file_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"pptx-bytes");

    let (status, body) = app.upload(&[("questionId", question_id.as_str())], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("No file provided"));
}

#[tokio::test]
async fn deleting_folder_keeps_its_files() {
    let app = test_app().await;
    let question_id = app.create_question("Folder test", json!([])).await;
    let (_, folder) = app
        .json(
            "POST",
            "/api/folders",
            json!({ "name": "Notes", "questionId": question_id }),
        )
        .await;
    let folder_id = folder["data"]["id"].as_str().unwrap().to_string();
    for name in ["a.pdf", "b.png", "c.docx"] {
        let (status, body) = app
            .upload(
                &[
                    ("questionId", question_id.as_str()),
                    ("folderId", folder_id.as_str()),
                ],
                Some((name, b"data")),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["folderId"], json!(folder_id));
    }
    let (_, stats) = app.get("/api/statistics").await;
    assert_eq!(stats["data"]["totalFiles"], json!(3));

    let (status, _) = app.delete(&format!("/api/folders?id={folder_id}")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, files) = app
        .get(&format!("/api/files?questionId={question_id}&folderId=null"))
        .await;
    let files = files["data"].as_array().unwrap();
    assert_eq!(files.len(), 3);
    assert!(files.iter().all(|f| f["folderId"].is_null()));

    let (_, stats) = app.get("/api/statistics").await;
    assert_eq!(stats["data"]["totalFiles"], json!(3));
    assert_eq!(stats["data"]["questionsWithFiles"], json!(1));
}

#[tokio::test]
async fn file_update_moves_between_folders() {
    let app = test_app().await;
    let question_id = app.create_question("Moves", json!([])).await;
    let (_, folder) = app
        .json(
            "POST",
            "/api/folders",
            json!({ "name": "Scans", "questionId": question_id }),
        )
        .await;
    let folder_id = folder["data"]["id"].as_str().unwrap().to_string();
    let (_, file) = app
        .upload(&[("questionId", question_id.as_str())], Some(("x.pdf", b"x")))
        .await;
    let file_id = file["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = app
        .json("PUT", "/api/files", json!({ "id": file_id, "folderId": folder_id }))
        .await;
    assert_eq!(body["data"]["folderId"], json!(folder_id));
    assert_eq!(body["data"]["folderName"], json!("Scans"));

    let (_, body) = app
        .json("PUT", "/api/files", json!({ "id": file_id, "description": "cover" }))
        .await;
    assert_eq!(body["data"]["folderId"], json!(folder_id));

    let (_, body) = app
        .json("PUT", "/api/files", json!({ "id": file_id, "folderId": null }))
        .await;
    assert!(body["data"]["folderId"].is_null());
    assert_eq!(body["data"]["description"], json!("cover"));
}

#[tokio::test]
async fn deleting_subject_cascades_and_removes_bytes() {
    let app = test_app().await;
    let question_id = app.create_question("Cascade", json!(["2001"])).await;
    let (_, file) = app
        .upload(&[("questionId", question_id.as_str())], Some(("x.pdf", b"x")))
        .await;
    let rel_path = file["data"]["url"].as_str().unwrap().to_string();
    assert!(app.dir.path().join(&rel_path).exists());

    let (_, subjects) = app.get("/api/subjects").await;
    let subject_id = subjects["data"][0]["id"].as_str().unwrap().to_string();
    let (status, _) = app.delete(&format!("/api/subjects?id={subject_id}")).await;
    assert_eq!(status, StatusCode::OK);

    assert!(!app.dir.path().join(&rel_path).exists());
    let (status, _) = app.get(&format!("/api/questions?id={question_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, stats) = app.get("/api/statistics").await;
    assert_eq!(stats["data"]["totalSubjects"], json!(0));
    assert_eq!(stats["data"]["totalSystems"], json!(0));
    assert_eq!(stats["data"]["totalQuestions"], json!(0));
    assert_eq!(stats["data"]["totalFiles"], json!(0));

    let (status, body) = app.delete(&format!("/api/subjects?id={subject_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Subject not found"));
}

#[tokio::test]
async fn seeding_is_idempotent() {
    let app = test_app().await;
    let (_, status) = app.get("/api/seed").await;
    assert_eq!(status["data"]["isSeeded"], json!(false));

    let (_, first) = app.json("POST", "/api/seed", json!({})).await;
    assert_eq!(first["data"]["subjects"], json!(3));
    assert_eq!(first["data"]["systems"], json!(30));
    assert_eq!(first["data"]["marksSections"], json!(210));
    let (_, second) = app.json("POST", "/api/seed", json!({})).await;
    assert_eq!(second["data"]["subjects"], json!(0));
    assert_eq!(second["data"]["marksSections"], json!(0));

    let (_, added) = app.json("POST", "/api/seed-questions", json!({})).await;
    assert_eq!(added["data"]["questionsAdded"], json!(120));
    let (_, again) = app.json("POST", "/api/seed-questions", json!({})).await;
    assert_eq!(again["data"]["questionsAdded"], json!(0));

    let (_, status) = app.get("/api/seed-questions").await;
    assert_eq!(status["data"]["questionsCount"], json!(120));
    let (_, stats) = app.get("/api/statistics").await;
    assert_eq!(stats["data"]["totalQuestions"], json!(120));
    let marks: Vec<i64> = stats["data"]["marksBreakdown"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["marks"].as_i64().unwrap())
        .collect();
    assert_eq!(marks, vec![10, 8, 5, 4, 3, 2, 1]);
}

#[tokio::test]
async fn backup_replace_round_trip_preserves_counts() {
    let app = test_app().await;
    app.json("POST", "/api/seed", json!({})).await;
    app.json("POST", "/api/seed-questions", json!({})).await;
    let (_, questions) = app.get("/api/questions?limit=1").await;
    let question_id = questions["data"][0]["id"].as_str().unwrap().to_string();
    let (_, folder) = app
        .json(
            "POST",
            "/api/folders",
            json!({ "name": "Refs", "questionId": question_id }),
        )
        .await;
    let folder_id = folder["data"]["id"].as_str().unwrap().to_string();
    app.upload(
        &[
            ("questionId", question_id.as_str()),
            ("folderId", folder_id.as_str()),
        ],
        Some(("ref.pdf", b"ref")),
    )
    .await;

    let (status, export) = app.get("/api/backup").await;
    assert_eq!(status, StatusCode::OK);
    let document = &export["data"];
    assert_eq!(document["version"], json!("1.0"));
    assert!(document["data"]["questions"][0]["years"].is_array());
    let filepath = document["file"]["filepath"].as_str().unwrap();
    assert!(std::path::Path::new(filepath).exists());
    let before = document["counts"].clone();
    assert_eq!(before["folders"], json!(1));
    assert_eq!(before["files"], json!(1));

    let (status, imported) = app
        .json(
            "POST",
            "/api/backup",
            json!({ "data": document["data"], "mode": "replace" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{imported}");
    assert_eq!(imported["data"]["errors"], json!([]));
    assert_eq!(imported["data"]["questions"], json!(120));

    let (_, export) = app.get("/api/backup").await;
    assert_eq!(export["data"]["counts"], before);
}

#[tokio::test]
async fn backup_import_collects_record_errors() {
    let app = test_app().await;
    let data = json!({
        "subjects": [
            { "id": "s1", "name": "Anatomy", "color": "#000000" },
            { "id": "s2", "color": "#ffffff" }
        ],
        "systems": [
            { "id": "y1", "name": "Limbs", "order": 0, "subjectId": "missing" }
        ],
        "questions": [
            { "id": "q1", "title": "Ghost", "subjectId": "s1", "systemId": "y1", "marksSectionId": "m1" }
        ]
    });
    let (status, body) = app
        .json("POST", "/api/backup", json!({ "data": data, "mode": "merge" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["subjects"], json!(1));
    assert_eq!(body["data"]["systems"], json!(0));
    assert_eq!(body["data"]["questions"], json!(0));
    let errors: Vec<&str> = body["data"]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap())
        .collect();
    assert_eq!(errors.len(), 3);
    assert!(errors[0].starts_with("Subject: <unnamed> - "));
    assert!(errors[1].starts_with("System: Limbs - "));
    assert!(errors[2].starts_with("Question: Ghost - "));

    let (status, body) = app.json("POST", "/api/backup", json!({ "mode": "merge" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("No backup data provided"));
}

#[tokio::test]
async fn backup_import_accepts_legacy_year_shapes() {
    let app = test_app().await;
    let this_year = chrono::Utc::now().year();
    let data = json!({
        "subjects": [{ "id": "s1", "name": "Anatomy", "color": "#000000" }],
        "systems": [{ "id": "y1", "name": "Limbs", "order": 0, "subjectId": "s1" }],
        "marksSections": [{ "id": "m1", "marks": 10, "label": "10 Markers", "systemId": "y1" }],
        "questions": [
            {
                "id": "q1",
                "title": "Serialized years",
                "years": format!("[\"{this_year}\",\"1990\"]"),
                "globalImportance": 0.0,
                "subjectId": "s1",
                "systemId": "y1",
                "marksSectionId": "m1"
            },
            {
                "id": "q2",
                "title": "Numeric years",
                "years": [this_year, 1991, 1992],
                "globalImportance": 0.0,
                "subjectId": "s1",
                "systemId": "y1",
                "marksSectionId": "m1"
            }
        ],
        "folders": [{ "id": "f1", "name": "Refs", "questionId": "q1" }],
        "files": [{
            "id": "a1",
            "name": "ref.pdf",
            "type": "pdf",
            "url": "files/ab/missing.pdf",
            "questionId": "q1",
            "folderId": "f1"
        }]
    });
    let (status, body) = app
        .json("POST", "/api/backup", json!({ "data": data, "mode": "merge" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["errors"], json!([]));
    assert_eq!(body["data"]["questions"], json!(2));
    assert_eq!(body["data"]["folders"], json!(1));
    assert_eq!(body["data"]["files"], json!(1));

    let (_, first) = app.get("/api/questions?id=q1").await;
    assert_eq!(first["data"]["years"], json!([this_year.to_string(), "1990"]));
    assert_eq!(first["data"]["repeatCount"], json!(2));
    assert_eq!(first["data"]["importanceScore"], json!(0.16));
    let (_, second) = app.get("/api/questions?id=q2").await;
    assert_eq!(second["data"]["repeatCount"], json!(3));
    assert_eq!(second["data"]["years"][1], json!("1991"));
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
    let app = test_app().await;
    let (subject_id, system_id, section_id) = app.scaffold().await;
    for title in ["T_cell defects", "Tx cell defects", "100% oxygen", "1000 oxygen"] {
        let (status, body) = app
            .json(
                "POST",
                "/api/questions",
                json!({
                    "title": title,
                    "subjectId": subject_id,
                    "systemId": system_id,
                    "marksSectionId": section_id
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
    let (_, body) = app.get("/api/questions?search=T_cell").await;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["T_cell defects"]);

    let (_, body) = app.get("/api/questions?search=100%25").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["title"], json!("100% oxygen"));
}
