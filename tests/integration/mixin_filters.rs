//! Filter modules: mixin filters merged with a unit's own filters, each mixin
//! extracted and emitted once per session.

use anyhow::Result;
use mpdeps::core::UnitId;
use mpdeps::store::Slot;
use mpdeps::test_utils::ProjectFixture;

const M1: &str = "---\nfilters:\n  upper: \"function (s) { return 'm1' }\"\n---\n";
const M2: &str = "---\nfilters:\n  upper: \"function (s) { return 'm2' }\"\n  lower: \"function (s) { return s.toLowerCase() }\"\n---\n";

fn project() -> Result<ProjectFixture> {
    let project = ProjectFixture::new()?;
    project.write("src/mixins/m1.js", M1)?;
    project.write("src/mixins/m2.js", M2)?;
    Ok(project)
}

#[tokio::test]
async fn test_later_mixin_wins_name_collision() -> Result<()> {
    let project = project()?;
    let page = project.write(
        "src/pages/p.vue",
        "---\nmixins:\n  - ../mixins/m1.js\n  - ../mixins/m2.js\n---\n<view>{{ upper(title) }}</view>",
    )?;
    let test = project.session(project.config());
    test.session.without_global_components();
    test.compile_unit(&page).await?;

    let module = test.output.get("pages/p.wxs").unwrap();
    assert!(module.contains("var __mixin0 = require(\"../mixins/m1.wxs\");"));
    assert!(module.contains("var __mixin1 = require(\"../mixins/m2.wxs\");"));
    assert!(module.contains("upper: __mixin1.upper,"));
    assert!(module.contains("lower: __mixin1.lower,"));
    assert!(!module.contains("__mixin0.upper"));

    // Each mixin gets its own module
    assert!(test.output.get("mixins/m1.wxs").unwrap().contains("return 'm1'"));
    assert!(test.output.get("mixins/m2.wxs").unwrap().contains("return 'm2'"));

    let markup = test.output.get("pages/p.wxml").unwrap();
    assert!(markup.contains("<wxs src=\"./p.wxs\" module=\"pFilters\" />"));

    let record = test.session.store().get(&UnitId::new(&page)).unwrap();
    let descriptor = record.filters.ready().unwrap().as_ref().unwrap();
    assert_eq!(descriptor.output_path, "./p.wxs");
    assert_eq!(descriptor.export_name, "pFilters");
    Ok(())
}

#[tokio::test]
async fn test_local_filter_overrides_mixin() -> Result<()> {
    let project = project()?;
    let page = project.write(
        "src/pages/p.vue",
        "---\nmixins:\n  - ../mixins/m1.js\nfilters:\n  upper: \"function (s) { return 'local' }\"\n---\n<view />",
    )?;
    let test = project.session(project.config());
    test.session.without_global_components();
    test.compile_unit(&page).await?;

    let module = test.output.get("pages/p.wxs").unwrap();
    assert!(module.contains("upper: function (s) { return 'local' },"));
    assert!(!module.contains("__mixin0.upper"));
    Ok(())
}

#[tokio::test]
async fn test_shared_mixin_extracted_once() -> Result<()> {
    let project = project()?;
    let mut units = Vec::new();
    for i in 0..20 {
        units.push(project.write(
            &format!("src/components/c{i}.vue"),
            "---\nmixins:\n  - ../mixins/m1.js\n---\n<view>{{ upper(name) }}</view>",
        )?);
    }
    let test = project.session(project.config());
    test.session.without_global_components();

    let results = futures::future::join_all(units.iter().map(|unit| test.compile_unit(unit))).await;
    for result in results {
        result?;
    }

    assert_eq!(test.session.mixins().extraction_count(), 1);
    assert_eq!(test.analyzer.extractions(), 1);
    assert_eq!(test.output.write_count("mixins/m1.wxs"), 1);
    for i in 0..20 {
        let module = test.output.get(&format!("components/c{i}.wxs")).unwrap();
        assert!(module.contains("upper: __mixin0.upper,"));
    }
    assert_eq!(test.session.summary().filter_modules, 21);
    Ok(())
}

#[tokio::test]
async fn test_unit_without_filters() -> Result<()> {
    let project = project()?;
    let card = project.write("src/components/card.vue", "<view>card</view>")?;
    let test = project.session(project.config());
    test.session.without_global_components();
    test.compile_unit(&card).await?;

    let record = test.session.store().get(&UnitId::new(&card)).unwrap();
    assert_eq!(record.filters, Slot::Ready(None));
    assert!(test.output.get("components/card.wxs").is_none());
    assert!(!test.output.get("components/card.wxml").unwrap().contains("<wxs"));
    Ok(())
}

#[tokio::test]
async fn test_unresolvable_mixin_skipped() -> Result<()> {
    let project = project()?;
    let page = project.write(
        "src/pages/p.vue",
        "---\nmixins:\n  - ../mixins/missing.js\n  - ../mixins/m1.js\n---\n<view />",
    )?;
    let test = project.session(project.config());
    test.session.without_global_components();
    test.compile_unit(&page).await?;

    let module = test.output.get("pages/p.wxs").unwrap();
    assert!(module.contains("upper: __mixin0.upper,"));
    assert!(test.session.summary().failed.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_es_module_syntax_on_my() -> Result<()> {
    let project = project()?;
    let page = project.write("src/pages/p.vue", "---\nmixins:\n  - ../mixins/m1.js\n---\n<view />")?;
    let mut config = project.config();
    config.platform = mpdeps::config::Platform::My;
    let test = project.session(config);
    test.session.without_global_components();
    test.compile_unit(&page).await?;

    let module = test.output.get("pages/p.sjs").unwrap();
    assert!(module.contains("import __mixin0 from \"../mixins/m1.sjs\";"));
    assert!(module.contains("export default {"));
    assert!(test.output.get("mixins/m1.sjs").unwrap().starts_with("export default {"));
    Ok(())
}
