//! Markup generation waits for complete records, and gives up with a typed
//! error when the record can never complete.

use std::time::Duration;

use anyhow::Result;
use mpdeps::core::{MpError, UnitId};
use mpdeps::host::ParsedTemplate;
use mpdeps::session::MarkupCall;
use mpdeps::store::Slot;
use mpdeps::test_utils::ProjectFixture;

#[tokio::test]
async fn test_markup_waits_for_registry() -> Result<()> {
    let project = ProjectFixture::new()?;
    let main = project.write("src/main.js", "---\nglobal_components:\n  Card: ./card.vue\n---\n")?;
    project.write("src/card.vue", "<view />")?;
    let page = project.write("src/pages/p.vue", "<card />")?;
    let test = project.session(project.config());

    let pending = {
        let test = test.clone();
        let page = page.clone();
        tokio::spawn(async move { test.compile_unit(&page).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(test.output.get("pages/p.wxml").is_none());
    let record = test.session.store().get(&UnitId::new(&page)).unwrap();
    assert!(record.components.is_pending());

    test.compile_entry(&main).await?;
    tokio::time::timeout(Duration::from_secs(5), pending).await???;

    let markup = test.output.get("pages/p.wxml").unwrap();
    assert!(markup.contains("<import src=\"/card.wxml\" />"));
    assert_eq!(test.output.write_count("pages/p.wxml"), 1);
    Ok(())
}

#[tokio::test]
async fn test_markup_requested_before_script() -> Result<()> {
    let project = ProjectFixture::new()?;
    let card = project.write("src/card.vue", "<view />")?;
    let test = project.session(project.config());
    test.session.without_global_components();

    let markup = {
        let session = test.session.clone();
        let card = card.clone();
        tokio::spawn(async move {
            session.generate_markup(MarkupCall::new(&card, ParsedTemplate::new("<view />"))).await
        })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(test.output.paths().is_empty());

    let handle = test.session.compile_script(&card, "<view />", "data-v-1")?;
    handle.wait().await?;
    tokio::time::timeout(Duration::from_secs(5), markup).await???;

    assert!(test.output.get("card.wxml").is_some());
    Ok(())
}

#[tokio::test]
async fn test_analysis_failure_fails_waiters() -> Result<()> {
    let project = ProjectFixture::new()?;
    let source = "---\ncomponents: [unclosed\n---\n<view />";
    let bad = project.write("src/bad.vue", source)?;
    let test = project.session(project.config());
    test.session.without_global_components();

    let err = test.session.compile_script(&bad, source, "data-v-1").unwrap_err();
    assert!(matches!(err.downcast_ref::<MpError>(), Some(MpError::Analysis { .. })));

    let record = test.session.store().get(&UnitId::new(&bad)).unwrap();
    assert!(matches!(record.components, Slot::Failed(_)));
    assert!(matches!(record.filters, Slot::Failed(_)));

    let err = test
        .session
        .generate_markup(MarkupCall::new(&bad, ParsedTemplate::new("<view />")))
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<MpError>(), Some(MpError::UnitFailed { .. })));
    assert!(test.output.paths().is_empty());

    let summary = test.session.summary();
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.complete, 0);
    Ok(())
}

#[tokio::test]
async fn test_recompile_after_failure_recovers() -> Result<()> {
    let project = ProjectFixture::new()?;
    let unit = project.write("src/unit.vue", "---\nmixins: 3\n---\n<view />")?;
    let test = project.session(project.config());
    test.session.without_global_components();

    assert!(test.compile_unit(&unit).await.is_err());

    project.write("src/unit.vue", "<view />")?;
    test.compile_unit(&unit).await?;

    assert!(test.session.summary().failed.is_empty());
    assert!(test.output.get("unit.wxml").is_some());
    Ok(())
}

#[tokio::test]
async fn test_wait_timeout() -> Result<()> {
    let project = ProjectFixture::new()?;
    let mut config = project.config();
    config.readiness.timeout_ms = Some(50);
    let test = project.session(config);
    test.session.without_global_components();

    let never = project.path("src/never.vue");
    let err = test
        .session
        .generate_markup(MarkupCall::new(&never, ParsedTemplate::new("<view />")))
        .await
        .unwrap_err();
    match err.downcast_ref::<MpError>() {
        Some(MpError::WaitTimedOut {
            what,
            ..
        }) => assert!(what.contains("never.vue")),
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_component_resolution_times_out_without_registry() -> Result<()> {
    let project = ProjectFixture::new()?;
    let card = project.write("src/card.vue", "<view />")?;
    let mut config = project.config();
    config.readiness.timeout_ms = Some(50);
    let test = project.session(config);

    let handle = test.session.compile_script(&card, "<view />", "data-v-1")?;
    handle.wait().await?;

    let record = test.session.store().get(&UnitId::new(&card)).unwrap();
    match &record.components {
        Slot::Failed(reason) => assert!(reason.contains("global components")),
        other => panic!("unexpected slot: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_template_diagnostics_reported() -> Result<()> {
    let project = ProjectFixture::new()?;
    let main = project.write("src/main.js", "---\nglobal_components:\n  HeaderBar: ./header-bar.vue\n---\n")?;
    project.write("src/header-bar.vue", "<view />")?;
    let page = project.write("src/page.vue", "<view><header-baz /><text></view>")?;
    let test = project.session(project.config());

    test.compile_entry(&main).await?;
    test.compile_unit(&page).await?;

    let warnings = test.diagnostics.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].1.contains("<header-baz> is not a registered component, did you mean <header-bar>?"));

    let errors = test.diagnostics.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].1.starts_with("\n  Error compiling template:\n - "));

    // Markup is emitted despite the errors
    assert!(test.output.get("page.wxml").is_some());
    Ok(())
}
