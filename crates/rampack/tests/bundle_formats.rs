mod common;

use std::path::Path;
use std::sync::Arc;

use common::{fixture_with, RecordingTransformer};
use rampack::{
  parse_indexed_ram, BundleGraph, Bundler, BundlerOptions, SerializeOptions, RAM_BUNDLE_MAGIC,
};
use rampack_fs::{FileSystem, MemoryFileSystem};

const APP: &[(&str, &str)] = &[
  ("/app/bundle.js", "require('./foo');\nrequire('./bar');\n"),
  ("/app/foo.js", "module.exports = require('./bar');\n"),
  ("/app/bar.js", "module.exports = 'bar';\n"),
];

async fn one_shot(
  files: &[(&str, &str)],
  entries: &[&str],
  options: BundlerOptions,
) -> (BundleGraph, Arc<MemoryFileSystem>) {
  let fs = Arc::new(MemoryFileSystem::new());
  for (path, content) in files {
    fs.add_file(*path, *content);
  }
  let shared: Arc<dyn FileSystem> = fs.clone();
  let options = BundlerOptions {
    entries: Some(entries.iter().map(std::path::PathBuf::from).collect()),
    ..options
  };
  let bundler =
    Bundler::with_collaborators(options, shared, Arc::new(RecordingTransformer::new())).unwrap();
  (bundler.build().await.unwrap(), fs)
}

#[tokio::test]
async fn plain_bundles_wrap_modules_and_rewrite_requires() {
  let (built, _fs) = one_shot(APP, &["/app/bundle.js"], BundlerOptions::default()).await;
  let bundle = built.to_plain(&SerializeOptions::default());

  // Entry first, edges in source order, one registration per module.
  assert_eq!(bundle.code.matches("__d(function(require, module, exports) {").count(), 3);
  let entry_at = bundle.code.find(", 0);").unwrap();
  let foo_at = bundle.code.find(", 1);").unwrap();
  let bar_at = bundle.code.find(", 2);").unwrap();
  assert!(entry_at < foo_at && foo_at < bar_at);

  // Textual requests are gone; numeric requires remain.
  assert!(!bundle.code.contains("require('./foo')"));
  assert!(bundle.code.contains("require(1)"));
  assert!(bundle.code.contains("require(2)"));

  // The startup require for the entry point runs last.
  let startup_at = bundle.code.rfind("require(0);").unwrap();
  assert!(startup_at > bar_at);
}

#[tokio::test]
async fn plain_bundles_are_deterministic() {
  let (first, _fs) = one_shot(APP, &["/app/bundle.js"], BundlerOptions::default()).await;
  let (second, _fs) = one_shot(APP, &["/app/bundle.js"], BundlerOptions::default()).await;
  let options = SerializeOptions::default();

  assert_eq!(first.to_plain(&options).code, second.to_plain(&options).code);
  assert_eq!(first.to_plain(&options).map, second.to_plain(&options).map);
  assert_eq!(first.to_indexed_ram(&options).bytes, second.to_indexed_ram(&options).bytes);
}

#[tokio::test]
async fn source_map_trailers_follow_the_options() {
  let (built, _fs) = one_shot(APP, &["/app/bundle.js"], BundlerOptions::default()).await;

  let with_url = built.to_plain(&SerializeOptions {
    source_map_url: Some("/bundle.map".to_string()),
    ..Default::default()
  });
  assert!(with_url.code.ends_with("//# sourceMappingURL=/bundle.map\n"));

  let inline = built.to_plain(&SerializeOptions { inline_source_map: true, ..Default::default() });
  assert!(inline
    .code
    .contains("//# sourceMappingURL=data:application/json;charset=utf-8;base64,"));

  let plain = built.to_plain(&SerializeOptions::default());
  assert!(!plain.code.contains("sourceMappingURL"));
}

#[tokio::test]
async fn indexed_ram_bundles_round_trip_their_header() {
  let (built, _fs) = one_shot(APP, &["/app/bundle.js"], BundlerOptions::default()).await;
  let bundle = built.to_indexed_ram(&SerializeOptions::default());

  assert_eq!(&bundle.bytes[0..4], &[0xE5, 0xD1, 0x0B, 0xFB]);

  let parsed = parse_indexed_ram(&bundle.bytes).unwrap();
  assert_eq!(parsed.table.len(), 3);

  // The startup section requires the entry by id.
  let startup = String::from_utf8(parsed.startup.clone()).unwrap();
  assert!(startup.contains("require(0);"));

  // Reading back each (offset, length) slice yields NUL-terminated code.
  for (id, (offset, length)) in parsed.table.iter().enumerate() {
    let (offset, length) = (*offset as usize, *length as usize);
    assert!(length > 0, "id {id} should be emitted");
    let code = &bundle.bytes[offset..offset + length];
    let text = std::str::from_utf8(code).unwrap();
    assert!(text.starts_with("__d(function(require, module, exports) {"));
    assert!(text.ends_with(&format!(", {id});")));
    assert_eq!(bundle.bytes[offset + length], 0);
  }
}

#[tokio::test]
async fn indexed_ram_leaves_holes_for_unused_ids() {
  // The entry is id 0, the asset takes id 1 but is excluded from the
  // index, so the table keeps a (0, 0) hole... unless the asset id is the
  // maximum, in which case the table simply ends before it.
  let (built, _fs) = one_shot(
    &[
      ("/app/bundle.js", "require('./logo.png');\nrequire('./foo');\n"),
      ("/app/logo.png", "not really a png"),
      ("/app/foo.js", "7;\n"),
    ],
    &["/app/bundle.js"],
    BundlerOptions::default(),
  )
  .await;
  let bundle = built.to_indexed_ram(&SerializeOptions::default());

  assert_eq!(bundle.assets, vec!["/app/logo.png".into()]);

  let parsed = parse_indexed_ram(&bundle.bytes).unwrap();
  assert_eq!(parsed.table.len(), 3);
  assert_eq!(parsed.table[1], (0, 0));
  assert!(parsed.table[0].1 > 0);
  assert!(parsed.table[2].1 > 0);
}

#[tokio::test]
async fn file_ram_bundles_write_the_sentinel_layout() {
  let (built, fs) = one_shot(APP, &["/app/bundle.js"], BundlerOptions::default()).await;
  built.write_file_ram(Path::new("/out")).unwrap();

  assert_eq!(fs.read(Path::new("/out/UNBUNDLE")).unwrap(), vec![0xE5, 0xD1, 0x0B, 0xFB]);
  assert_eq!(
    RAM_BUNDLE_MAGIC.to_le_bytes().to_vec(),
    fs.read(Path::new("/out/UNBUNDLE")).unwrap(),
  );

  let startup = fs.read_to_string(Path::new("/out/js-modules/UNBUNDLE.js")).unwrap();
  assert!(startup.contains("require(0);"));

  for id in 0..3 {
    let code = fs.read_to_string(Path::new(&format!("/out/js-modules/{id}.js"))).unwrap();
    assert!(code.contains(&format!(", {id});")));
  }
}

#[tokio::test]
async fn assets_become_registration_modules_in_plain_bundles() {
  let (built, _fs) = one_shot(
    &[
      ("/app/bundle.js", "require('./logo.png');\n"),
      ("/app/logo.png", "not really a png"),
    ],
    &["/app/bundle.js"],
    BundlerOptions::default(),
  )
  .await;

  let bundle = built.to_plain(&SerializeOptions::default());
  assert!(bundle.code.contains(r#"module.exports = {"uri":"/app/logo.png"};"#));
}

#[tokio::test]
async fn prelude_scripts_are_emitted_verbatim_and_first() {
  let (built, _fs) = one_shot(
    &[
      ("/app/polyfill.js", "globalThis.__DEV__ = true;\n"),
      ("/app/bundle.js", "8;\n"),
    ],
    &["/app/bundle.js"],
    BundlerOptions {
      polyfills: Some(vec!["/app/polyfill.js".into()]),
      ..Default::default()
    },
  )
  .await;

  let bundle = built.to_plain(&SerializeOptions::default());
  let polyfill_at = bundle.code.find("globalThis.__DEV__ = true;").unwrap();
  let module_at = bundle.code.find("__d(").unwrap();
  assert!(polyfill_at < module_at);
  // Scripts are not wrapped.
  assert!(!bundle.code[polyfill_at..module_at].contains("__d("));
}

#[tokio::test]
async fn delta_responses_carry_the_wire_format_end_to_end() {
  let fixture = fixture_with(
    &[("/app/bundle.js", "require('./foo');\n"), ("/app/foo.js", "9;\n")],
    &["/app/bundle.js"],
    BundlerOptions::default(),
  )
  .await;

  // First request: no epoch, full replay.
  let response = fixture.session.delta_response(None).await.unwrap();
  assert!(response.reset);
  assert_eq!(response.post.len(), 1);
  assert_eq!(response.delta.len(), 2);
  assert!(response.delta.iter().all(|(_, code)| code.is_some()));

  // Same epoch, no edits: nothing to send.
  let idle = fixture.session.delta_response(Some(&response.id)).await.unwrap();
  assert!(!idle.reset);
  assert!(idle.delta.is_empty());
  assert_eq!(idle.id, response.id);

  // An edit produces an incremental delta under a new epoch.
  fixture.edit("/app/foo.js", "10;\n");
  let incremental = fixture.session.delta_response(Some(&idle.id)).await.unwrap();
  assert!(!incremental.reset);
  assert_ne!(incremental.id, idle.id);
  assert_eq!(incremental.delta.len(), 1);

  // A stale epoch forces a reset replay.
  let stale = fixture.session.delta_response(Some("rampack-unknown-9")).await.unwrap();
  assert!(stale.reset);

  // Deletions arrive as null codes.
  fixture.edit("/app/bundle.js", "11;\n");
  let current = fixture.session.delta_response(Some(&stale.id)).await.unwrap();
  let deletions: Vec<_> =
    current.delta.iter().filter(|(_, code)| code.is_none()).collect();
  assert_eq!(deletions.len(), 1);
}
