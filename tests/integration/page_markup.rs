//! Page entries: page markup emitted on its own, or appended to the root
//! component's markup on platforms that require it.

use anyhow::Result;
use mpdeps::config::Platform;
use regex::Regex;
use mpdeps::core::{PageType, UnitId};
use mpdeps::test_utils::ProjectFixture;

const PAGE_ENTRY: &str = "---\nimports:\n  App: ./index.vue\nroot_component: App\n---\n";

fn project() -> Result<ProjectFixture> {
    let project = ProjectFixture::new()?;
    project.write("src/pages/index/main.js", PAGE_ENTRY)?;
    project.write(
        "src/pages/index/index.vue",
        "---\ncomponents:\n  Card: ../../components/card.vue\n---\n<view><card />index</view>",
    )?;
    project.write("src/components/card.vue", "<view>card</view>")?;
    Ok(project)
}

/// Output-relative paths of every `<import src>` in `markup`.
fn imports(markup: &str) -> Vec<String> {
    let pattern = Regex::new(r#"<import src="/([^"]+)" />"#).unwrap();
    pattern.captures_iter(markup).map(|c| c[1].to_string()).collect()
}

fn config(project: &ProjectFixture, platform: Platform) -> mpdeps::config::BuildConfig {
    let mut config = project.config();
    config.platform = platform;
    config.pages = vec![project.path("src/pages/index/main.js")];
    config
}

#[tokio::test]
async fn test_page_markup_emitted_on_wx() -> Result<()> {
    let project = project()?;
    let test = project.session(config(&project, Platform::Wx));
    test.session.without_global_components();

    let outcome = test.compile_entry(&project.path("src/pages/index/main.js")).await?;
    assert_eq!(outcome.page_type, PageType::Page);
    assert!(outcome.page_markup);
    assert!(outcome.commit.is_none());

    assert_eq!(
        test.output.get("pages/index/main.wxml").unwrap(),
        "<import src=\"/pages/index/index.wxml\" />\n<template is=\"pages_index_index\" data=\"{{ ...$root['0'], $root }}\"/>\n"
    );

    test.compile_unit(&project.path("src/pages/index/index.vue")).await?;
    let component = test.output.get("pages/index/index.wxml").unwrap();
    assert!(component.contains("<template name=\"pages_index_index\">"));
    Ok(())
}

#[tokio::test]
async fn test_page_markup_appended_on_my() -> Result<()> {
    let project = project()?;
    let test = project.session(config(&project, Platform::My));
    test.session.without_global_components();
    let root = project.path("src/pages/index/index.vue");

    test.compile_entry(&project.path("src/pages/index/main.js")).await?;
    assert!(test.output.get("pages/index/main.axml").is_none());

    let record = test.session.store().get(&UnitId::new(&root)).unwrap();
    assert_eq!(record.page_markup.as_ref().unwrap().page_file_path, "pages/index/main.axml");

    test.compile_unit(&project.path("src/components/card.vue")).await?;
    test.compile_unit(&root).await?;
    let page = test.output.get("pages/index/main.axml").unwrap();
    let (component, appended) = page.split_once("</template>\n\n").unwrap();
    assert!(component.contains("<template name=\"pages_index_index\">"));
    assert_eq!(appended, "<template is=\"pages_index_index\" data=\"{{ ...$root['0'], $root }}\"/>\n");

    // Every import of the page file resolves to an emitted file
    let emitted = test.output.paths();
    let page_imports = imports(&page);
    assert_eq!(page_imports, vec!["components/card.axml".to_string()]);
    for path in &page_imports {
        assert!(emitted.contains(path), "{path} not emitted: {emitted:?}");
    }
    Ok(())
}

#[tokio::test]
async fn test_page_root_importable_by_other_units_on_my() -> Result<()> {
    let project = project()?;
    project.write("src/pages/other.vue", "---\ncomponents:\n  Index: ./index/index.vue\n---\n<view><index /></view>")?;
    let test = project.session(config(&project, Platform::My));
    test.session.without_global_components();

    test.compile_entry(&project.path("src/pages/index/main.js")).await?;
    test.compile_unit(&project.path("src/components/card.vue")).await?;
    test.compile_unit(&project.path("src/pages/index/index.vue")).await?;
    test.compile_unit(&project.path("src/pages/other.vue")).await?;

    let emitted = test.output.paths();
    let other_imports = imports(&test.output.get("pages/other.axml").unwrap());
    assert_eq!(other_imports, vec!["pages/index/index.axml".to_string()]);
    for path in &other_imports {
        assert!(emitted.contains(path), "{path} not emitted: {emitted:?}");
    }
    Ok(())
}

#[tokio::test]
async fn test_page_entry_after_root_markup_on_my() -> Result<()> {
    let project = project()?;
    let test = project.session(config(&project, Platform::My));
    test.session.without_global_components();
    let root = project.path("src/pages/index/index.vue");

    test.compile_unit(&root).await?;
    assert!(test.output.get("pages/index/index.axml").is_some());

    test.compile_entry(&project.path("src/pages/index/main.js")).await?;
    let page = test.output.get("pages/index/main.axml").unwrap();
    assert!(page.contains("<template is=\"pages_index_index\""));
    Ok(())
}

#[tokio::test]
async fn test_missing_root_component_skips_page_markup() -> Result<()> {
    let project = ProjectFixture::new()?;
    project.write("src/pages/empty/main.js", "---\nroot_component: ./gone.vue\n---\n")?;
    let mut config = project.config();
    config.pages = vec![project.path("src/pages/empty/main.js")];
    let test = project.session(config);

    let outcome = test.compile_entry(&project.path("src/pages/empty/main.js")).await?;
    assert!(!outcome.page_markup);
    assert!(test.output.paths().is_empty());
    Ok(())
}
