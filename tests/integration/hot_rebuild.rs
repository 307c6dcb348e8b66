//! Hot rebuild: recompiling the application entry with changed global
//! components refreshes every unit built against the old registry.

use anyhow::Result;
use mpdeps::core::UnitId;
use mpdeps::store::Slot;
use mpdeps::test_utils::ProjectFixture;

fn main_js(header: &str) -> String {
    format!("---\nglobal_components:\n  Header: ./components/{header}.vue\n---\n")
}

fn project() -> Result<ProjectFixture> {
    let project = ProjectFixture::new()?;
    project.write("src/main.js", &main_js("header"))?;
    project.write("src/components/header.vue", "<view>v1</view>")?;
    project.write("src/components/header-v2.vue", "<view>v2</view>")?;
    project.write("src/components/local-header.vue", "<view>local</view>")?;
    project.write("src/pages/a.vue", "<view><header /></view>")?;
    project.write(
        "src/pages/b.vue",
        "---\ncomponents:\n  Header: ../components/local-header.vue\n---\n<view><header /></view>",
    )?;
    Ok(project)
}

#[tokio::test]
async fn test_global_component_swap_replays_markup() -> Result<()> {
    let project = project()?;
    let test = project.session(project.config());
    let main = project.path("src/main.js");
    let a = project.path("src/pages/a.vue");

    let first = test.compile_entry(&main).await?;
    let commit = first.commit.unwrap();
    assert!(commit.changed);
    assert!(!commit.had_previous);
    assert_eq!(commit.version, 1);
    assert_eq!(first.replayed, 0);

    test.compile_unit(&a).await?;
    let markup = test.output.get("pages/a.wxml").unwrap();
    assert!(markup.contains("<import src=\"/components/header.wxml\" />"));
    assert_eq!(test.output.write_count("pages/a.wxml"), 1);

    project.write("src/main.js", &main_js("header-v2"))?;
    let second = test.compile_entry(&main).await?;
    let commit = second.commit.unwrap();
    assert!(commit.changed);
    assert!(commit.had_previous);
    assert_eq!(commit.version, 2);
    assert_eq!(second.replayed, 1);

    let markup = test.output.get("pages/a.wxml").unwrap();
    assert!(markup.contains("<import src=\"/components/header-v2.wxml\" />"));
    assert!(!markup.contains("/components/header.wxml"));
    assert_eq!(test.output.write_count("pages/a.wxml"), 2);

    // Replay re-merges and re-renders; the unit itself is not analyzed again
    assert_eq!(test.analyzer.analyses(&a), 1);
    let record = test.session.store().get(&UnitId::new(&a)).unwrap();
    assert_eq!(record.registry_version, Some(2));
    let header = record.components.ready().unwrap().get("header").unwrap();
    assert_eq!(header.target_path, "/components/header-v2.wxml");
    Ok(())
}

#[tokio::test]
async fn test_unchanged_rebuild_replays_nothing() -> Result<()> {
    let project = project()?;
    let test = project.session(project.config());
    let main = project.path("src/main.js");
    let a = project.path("src/pages/a.vue");

    test.compile_entry(&main).await?;
    test.compile_unit(&a).await?;

    let again = test.compile_entry(&main).await?;
    let commit = again.commit.unwrap();
    assert!(!commit.changed);
    assert_eq!(commit.version, 1);
    assert_eq!(again.replayed, 0);
    assert_eq!(test.output.write_count("pages/a.wxml"), 1);
    assert_eq!(test.session.summary().replayed, 0);
    Ok(())
}

#[tokio::test]
async fn test_local_component_wins_after_replay() -> Result<()> {
    let project = project()?;
    let test = project.session(project.config());
    let main = project.path("src/main.js");
    let b = project.path("src/pages/b.vue");

    test.compile_entry(&main).await?;
    test.compile_unit(&b).await?;
    assert!(test.output.get("pages/b.wxml").unwrap().contains("/components/local-header.wxml"));

    project.write("src/main.js", &main_js("header-v2"))?;
    assert_eq!(test.compile_entry(&main).await?.replayed, 1);

    let markup = test.output.get("pages/b.wxml").unwrap();
    assert!(markup.contains("<import src=\"/components/local-header.wxml\" />"));
    assert!(!markup.contains("header-v2"));
    assert_eq!(test.output.write_count("pages/b.wxml"), 2);
    Ok(())
}

#[tokio::test]
async fn test_globals_discovered_through_imports() -> Result<()> {
    let project = ProjectFixture::new()?;
    project.write(
        "src/main.js",
        "---\nimports:\n  plugins: ./plugins/index.js\nglobal_components:\n  Card: ./components/card.vue\n---\n",
    )?;
    project.write(
        "src/plugins/index.js",
        "---\nglobal_components:\n  Card: ../components/other-card.vue\n  Badge: ../components/badge.vue\n---\n",
    )?;
    project.write("src/components/card.vue", "")?;
    project.write("src/components/other-card.vue", "")?;
    project.write("src/components/badge.vue", "")?;

    let test = project.session(project.config());
    test.compile_entry(&project.path("src/main.js")).await?;

    let snapshot = test.session.registry().snapshot().unwrap();
    assert_eq!(snapshot.components.len(), 2);
    // The entry registered Card first
    assert_eq!(snapshot.components.get("card").unwrap().target_path, "/components/card.wxml");
    assert_eq!(snapshot.components.get("badge").unwrap().target_path, "/components/badge.wxml");
    Ok(())
}

#[tokio::test]
async fn test_failed_entry_keeps_registry() -> Result<()> {
    let project = project()?;
    let test = project.session(project.config());
    let main = project.path("src/main.js");

    test.compile_entry(&main).await?;
    project.write("src/main.js", "---\nglobal_components: [broken\n---\n")?;
    assert!(test.compile_entry(&main).await.is_err());

    let snapshot = test.session.registry().snapshot().unwrap();
    assert_eq!(snapshot.version, 1);
    assert!(snapshot.components.contains("header"));
    Ok(())
}

#[tokio::test]
async fn test_unit_compiled_during_rebuild_converges() -> Result<()> {
    let project = project()?;
    let test = project.session(project.config());
    let main = project.path("src/main.js");
    let a = project.path("src/pages/a.vue");

    test.compile_entry(&main).await?;
    project.write("src/main.js", &main_js("header-v2"))?;

    let (entry, unit) = tokio::join!(test.compile_entry(&main), test.compile_unit(&a));
    entry?;
    unit?;

    let record = test.session.store().get(&UnitId::new(&a)).unwrap();
    assert_eq!(record.registry_version, Some(2));
    assert!(matches!(record.components, Slot::Ready(_)));
    assert!(test.output.get("pages/a.wxml").unwrap().contains("/components/header-v2.wxml"));
    Ok(())
}

#[tokio::test]
async fn test_failed_unit_not_replayed() -> Result<()> {
    let project = project()?;
    let test = project.session(project.config());
    let main = project.path("src/main.js");
    let a = project.path("src/pages/a.vue");

    test.compile_entry(&main).await?;
    test.compile_unit(&a).await?;
    project.write("src/pages/a.vue", "---\ncomponents: [unclosed\n---\n<view><header /></view>")?;
    assert!(test.compile_unit(&a).await.is_err());

    project.write("src/main.js", &main_js("header-v2"))?;
    let rebuilt = test.compile_entry(&main).await?;
    assert_eq!(rebuilt.commit.unwrap().version, 2);
    assert_eq!(rebuilt.replayed, 0);

    // The failure stands until the unit is compiled again
    let record = test.session.store().get(&UnitId::new(&a)).unwrap();
    assert!(matches!(record.components, Slot::Failed(_)));
    assert!(record.failure().is_some());
    assert_eq!(test.output.write_count("pages/a.wxml"), 1);
    assert_eq!(test.session.summary().replayed, 0);

    project.write("src/pages/a.vue", "<view><header /></view>")?;
    test.compile_unit(&a).await?;
    assert!(test.output.get("pages/a.wxml").unwrap().contains("/components/header-v2.wxml"));
    Ok(())
}

#[tokio::test]
async fn test_summary_counts_distinct_refreshed_units() -> Result<()> {
    let project = project()?;
    let test = project.session(project.config());
    let main = project.path("src/main.js");

    test.compile_entry(&main).await?;
    test.compile_unit(&project.path("src/pages/a.vue")).await?;

    project.write("src/main.js", &main_js("header-v2"))?;
    assert_eq!(test.compile_entry(&main).await?.replayed, 1);
    project.write("src/main.js", &main_js("header"))?;
    assert_eq!(test.compile_entry(&main).await?.replayed, 1);

    assert_eq!(test.output.write_count("pages/a.wxml"), 3);
    assert_eq!(test.session.summary().replayed, 1);
    Ok(())
}
