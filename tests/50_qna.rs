mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

async fn seeded() -> Result<common::TestServer> {
    let server = common::spawn_server().await?;
    server.seed("qna", json!({"q": "1", "type": "quiz", "difficulty": "hard"})).await?;
    server.seed("qna", json!({"q": "2", "type": "quiz", "difficulty": "easy"})).await?;
    server.seed("qna", json!({"q": "3", "type": "mcq", "difficulty": "hard"})).await?;
    server.seed("qna", json!({"q": "4"})).await?;
    Ok(server)
}

#[tokio::test]
async fn no_filters_return_everything() -> Result<()> {
    let server = seeded().await?;
    assert_eq!(server.list("/qna").await?.len(), 4);
    Ok(())
}

#[tokio::test]
async fn type_filter() -> Result<()> {
    let server = seeded().await?;
    let docs = server.list("/qna?type=quiz").await?;
    assert_eq!(docs.len(), 2);
    assert!(docs.iter().all(|d| d["type"] == "quiz"));
    Ok(())
}

#[tokio::test]
async fn both_filters_are_conjunctive() -> Result<()> {
    let server = seeded().await?;
    let docs = server.list("/qna?difficulty=hard&type=quiz").await?;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["q"], "1");
    Ok(())
}

#[tokio::test]
async fn unmatched_filter_is_empty() -> Result<()> {
    let server = seeded().await?;
    assert!(server.list("/qna?type=essay").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn qna_is_read_only() -> Result<()> {
    let server = seeded().await?;
    let res = server
        .client
        .post(server.url("/qna"))
        .json(&json!({"q": "5"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    Ok(())
}
