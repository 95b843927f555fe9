// tests/pipeline.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use buildgraph::exec::{Action, ActionContext};
use buildgraph::fs::{FileSystem, MockFileSystem};
use buildgraph::pipeline::transform::strip_line_comments;
use buildgraph::pipeline::{
    CopyFile, GlobResolver, InlineTemplates, PipelineAction, RenameExtension, StripLineComments,
    Transform,
};

type TestResult = Result<(), Box<dyn Error>>;

fn patterns(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn project() -> Arc<MockFileSystem> {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file(
        "/project/src/app/button.component.ts",
        "@Component({\n  selector: 'share-button',\n  templateUrl: './button.component.html',\n  styleUrls: ['./button.component.scss', '../shared/base.scss']\n})\nexport class ButtonComponent {}\n",
    );
    fs.add_file(
        "/project/src/app/button.component.html",
        "<a href=\"#\">\"share\"</a>\n",
    );
    fs.add_file("/project/src/app/button.component.scss", ".btn { color: red; }");
    fs.add_file("/project/src/app/button.component.css", ".btn{color:red}");
    fs.add_file("/project/src/shared/base.css", ".base{margin:0}");
    fs.add_file("/project/src/index.ts", "export * from './app/button.component';\n");
    fs.add_file("/project/node_modules/lib/index.ts", "ignored");
    fs
}

fn ctx(fs: &Arc<MockFileSystem>) -> ActionContext {
    ActionContext::new("/project").with_fs(fs.clone())
}

#[test]
fn glob_resolver_matches_relative_to_base() -> TestResult {
    let fs = project();
    let resolver = GlobResolver::new(&patterns(&["src/**/*.ts"]), &[])?;
    let files = resolver.resolve(fs.as_ref(), Path::new("/project"))?;
    assert_eq!(
        files,
        vec![
            PathBuf::from("/project/src/app/button.component.ts"),
            PathBuf::from("/project/src/index.ts"),
        ]
    );
    Ok(())
}

#[test]
fn single_star_does_not_cross_directories_and_exclude_wins() -> TestResult {
    let fs = project();

    let resolver = GlobResolver::new(&patterns(&["src/*.ts"]), &[])?;
    let files = resolver.resolve(fs.as_ref(), Path::new("/project"))?;
    assert_eq!(files, vec![PathBuf::from("/project/src/index.ts")]);

    let resolver = GlobResolver::new(&patterns(&["src/**/*"]), &patterns(&["**/*.css", "**/*.html"]))?;
    let files = resolver.resolve(fs.as_ref(), Path::new("/project"))?;
    assert!(files.iter().all(|f| {
        let ext = f.extension().and_then(|e| e.to_str());
        ext == Some("ts") || ext == Some("scss")
    }));
    assert_eq!(files.len(), 3);
    Ok(())
}

#[test]
fn literal_pattern_and_invalid_pattern() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/p/README.md", "hi");
    let resolver = GlobResolver::new(&patterns(&["README.md", "LICENSE"]), &[])?;
    assert_eq!(
        resolver.resolve(&fs, Path::new("/p"))?,
        vec![PathBuf::from("/p/README.md")]
    );

    assert!(GlobResolver::new(&patterns(&["src/[unclosed"]), &[]).is_err());
    Ok(())
}

#[test]
fn strip_line_comments_respects_strings_and_urls() {
    let input = "// header\n$c: red; // trailing\n.a { background: url(http://x.com/a.png); }\n.b { content: \"// not a comment\"; }\n";
    let expected = "$c: red;\n.a { background: url(http://x.com/a.png); }\n.b { content: \"// not a comment\"; }\n";
    assert_eq!(strip_line_comments(input), expected);
    assert_eq!(strip_line_comments("a {}"), "a {}");
}

#[test]
fn strip_line_comments_leaves_bare_urls_and_block_comments_intact() {
    let input = ".a { background: url(//cdn.example.com/x.png); }\n/* see // here */\n.b{}\n/* open\n  // still inside\n*/ .c{} // gone\n";
    let expected = ".a { background: url(//cdn.example.com/x.png); }\n/* see // here */\n.b{}\n/* open\n  // still inside\n*/ .c{}\n";
    assert_eq!(strip_line_comments(input), expected);
}

#[test]
fn inline_templates_replaces_urls_with_escaped_content() -> TestResult {
    let fs = project();
    let inliner = InlineTemplates::new()?;
    let source = fs.read_to_string(Path::new("/project/src/app/button.component.ts"))?;

    let out = inliner.inline(&ctx(&fs), Path::new("/project/src/app"), &source)?;

    assert!(out.contains(r##"template: "<a href=\"#\">\"share\"</a>\n""##), "{out}");
    assert!(out.contains(r#"styles: [".btn{color:red}", ".base{margin:0}"]"#), "{out}");
    assert!(!out.contains("templateUrl"));
    assert!(!out.contains("styleUrls"));
    Ok(())
}

#[test]
fn inline_templates_fails_on_missing_reference() -> TestResult {
    let fs = Arc::new(MockFileSystem::new());
    let inliner = InlineTemplates::new()?;
    let result = inliner.inline(
        &ctx(&fs),
        Path::new("/project/src"),
        "@Component({ templateUrl: './gone.html' })",
    );
    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("gone.html"));
    Ok(())
}

#[tokio::test]
async fn pipeline_preserves_relative_paths_under_dest() -> TestResult {
    init_tracing();
    let fs = project();
    let transforms: Vec<Arc<dyn Transform>> = vec![Arc::new(InlineTemplates::new()?)];
    let action = PipelineAction::new(
        GlobResolver::new(&patterns(&["**/*.ts"]), &[])?,
        "src",
        "dist/inlined",
        transforms,
    );

    action.run(&ctx(&fs)).await?;

    let inlined = fs.read_to_string(Path::new("/project/dist/inlined/app/button.component.ts"))?;
    assert!(inlined.contains("template: "));
    assert!(fs.exists(Path::new("/project/dist/inlined/index.ts")));
    // Sources are untouched.
    let original = fs.read_to_string(Path::new("/project/src/app/button.component.ts"))?;
    assert!(original.contains("templateUrl"));
    Ok(())
}

#[tokio::test]
async fn style_pipeline_strips_comments_and_renames() -> TestResult {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/project/src/theme/a.scss", "// colours\n.a { color: red; } // red\n");
    let transforms: Vec<Arc<dyn Transform>> = vec![
        Arc::new(StripLineComments),
        Arc::new(RenameExtension {
            extension: "css".to_string(),
        }),
    ];
    let action = PipelineAction::new(
        GlobResolver::new(&patterns(&["**/*.scss"]), &[])?,
        "src",
        "src",
        transforms,
    );

    action.run(&ctx(&fs)).await?;

    assert_eq!(
        fs.read_to_string(Path::new("/project/src/theme/a.css"))?,
        ".a { color: red; }\n"
    );
    Ok(())
}

#[tokio::test]
async fn failing_file_fails_the_pipeline() -> TestResult {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/project/src/ok.ts", "export const ok = 1;");
    fs.add_file("/project/src/broken.ts", "@Component({ templateUrl: './missing.html' })");
    let transforms: Vec<Arc<dyn Transform>> = vec![Arc::new(InlineTemplates::new()?)];
    let action = PipelineAction::new(
        GlobResolver::new(&patterns(&["**/*.ts"]), &[])?,
        "src",
        "out",
        transforms,
    );

    let err = action.run(&ctx(&fs)).await.unwrap_err();
    assert!(format!("{err:#}").contains("missing.html"), "{err:#}");
    Ok(())
}

#[tokio::test]
async fn zero_matches_succeed() -> TestResult {
    let fs = Arc::new(MockFileSystem::new());
    let transforms: Vec<Arc<dyn Transform>> = vec![Arc::new(CopyFile)];
    let action = PipelineAction::new(
        GlobResolver::new(&patterns(&["**/*.scss"]), &[])?,
        "src",
        "out",
        transforms,
    );
    action.run(&ctx(&fs)).await?;
    assert!(fs.file_paths().is_empty());
    Ok(())
}
