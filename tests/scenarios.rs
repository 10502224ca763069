//! Cross-module scenarios (spec.md §8): exercising the path, process,
//! manifest, version, and JSON layers together the way a consumer would.

use forgekit::fdio::{open_pipe, select, wait_readable, IfdStream, Interest, LineOutcome, Mode, OnClose, PipeMode};
use forgekit::json::{Event, MultiValue, Parser};
use forgekit::manifest::{parse_manifests, serialize_manifests, Manifest};
use forgekit::path::pattern::{path_search, SearchOptions};
use forgekit::path::{DirPath, Path as FPath, Platform};
use forgekit::process::{spawn, SpawnOptions, Stdio};
use forgekit::version::{parse_constraint, Flags, StandardVersion};
use std::io::{Read, Write};
use std::os::unix::io::{FromRawFd, IntoRawFd};
use std::time::Duration;

#[test]
fn wildcard_search_finds_nested_files_across_two_branches() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("a/b")).unwrap();
    std::fs::create_dir_all(root.join("a/e")).unwrap();
    std::fs::write(root.join("a/b/c.txt"), b"1").unwrap();
    std::fs::write(root.join("a/b/d.txt"), b"2").unwrap();
    std::fs::write(root.join("a/e/c.txt"), b"3").unwrap();

    let start = DirPath::new(root.to_string_lossy().into_owned(), Platform::HOST).unwrap();
    let pattern = FPath::new("a/**/c.txt", Platform::HOST).unwrap();

    let mut found = Vec::new();
    path_search(&start, &pattern, &SearchOptions::default(), |p| {
        found.push(p.as_str().to_string());
        true
    })
    .unwrap();
    found.sort();
    assert_eq!(found, vec!["a/b/c.txt".to_string(), "a/e/c.txt".to_string()]);
}

#[test]
fn pipe_round_trips_bytes_through_a_child_process() {
    let program = FPath::host("/bin/sh").unwrap();
    let mut opts = SpawnOptions::default();
    opts.stdin = Stdio::Pipe;
    opts.stdout = Stdio::Pipe;
    let mut p = spawn(&program, &["-c", "cat"], opts).unwrap();

    let raw_in = p.in_ofd.take().unwrap().into_raw_fd();
    let mut w = unsafe { std::fs::File::from_raw_fd(raw_in) };
    w.write_all(b"round trip\n").unwrap();
    drop(w);

    let raw_out = p.out_ifd.take().unwrap().into_raw_fd();
    let mut r = unsafe { std::fs::File::from_raw_fd(raw_out) };
    let mut got = String::new();
    r.read_to_string(&mut got).unwrap();

    assert!(p.wait().unwrap());
    assert_eq!(got, "round trip\n");
}

#[test]
fn fdselect_reports_readiness_without_blocking() {
    let pipe = open_pipe(PipeMode::default()).unwrap();
    assert!(!wait_readable(&pipe.read, Some(Duration::from_millis(50))).unwrap().readable);

    let mut w = unsafe { std::fs::File::from_raw_fd(pipe.write.try_clone().unwrap().release()) };
    w.write_all(b"x").unwrap();

    let readiness = select(&[(&pipe.read, Interest::Read)], Some(Duration::from_secs(1))).unwrap();
    assert!(readiness[0].readable);
}

#[test]
fn manifest_stream_round_trips_through_the_serializer() {
    let manifests = vec![
        Manifest {
            version: "1".to_string(),
            values: vec![
                ("name".to_string(), "libhello".to_string()),
                ("version".to_string(), "1.0.0".to_string()),
            ],
        },
        Manifest {
            version: "1".to_string(),
            values: vec![("name".to_string(), "libworld".to_string())],
        },
    ];
    let text = serialize_manifests(&manifests);
    let parsed = parse_manifests("roundtrip", &text).unwrap();
    assert_eq!(parsed, manifests);
}

#[test]
fn standard_version_parses_formats_and_satisfies_a_caret_constraint() {
    let v = StandardVersion::parse("1.2.3", Flags::NONE).unwrap();
    assert_eq!(v.string_project(false), "1.2.3");

    let dependent = v.clone();
    let constraint = parse_constraint("^$", Some(&dependent)).unwrap();
    assert!(constraint.satisfies(&StandardVersion::parse("1.9.0", Flags::NONE).unwrap()));
    assert!(!constraint.satisfies(&StandardVersion::parse("2.0.0", Flags::NONE).unwrap()));
}

#[test]
fn getline_non_blocking_drains_a_slowly_written_child_stream_scenario_s4() {
    let program = FPath::host("/bin/sh").unwrap();
    let mut opts = SpawnOptions::default();
    opts.stdout = Stdio::Pipe;
    let mut p = spawn(
        &program,
        &["-c", "for i in 1 2 3 4 5; do echo line$i; sleep 0.01; done"],
        opts,
    )
    .unwrap();

    let out_fd = p.out_ifd.take().unwrap();
    unsafe {
        let flags = libc::fcntl(out_fd.get(), libc::F_GETFL);
        libc::fcntl(out_fd.get(), libc::F_SETFL, flags | libc::O_NONBLOCK);
    }
    let mut input = IfdStream::new(out_fd, Mode::Text, OnClose::Close);

    let mut lines = Vec::new();
    let mut saw_would_block = false;
    loop {
        match input.getline_non_blocking().unwrap() {
            LineOutcome::Line(l) => lines.push(l),
            LineOutcome::Eof => break,
            LineOutcome::WouldBlock => {
                saw_would_block = true;
                std::thread::sleep(Duration::from_millis(3));
            }
        }
    }

    assert!(p.wait().unwrap());
    assert!(saw_would_block, "expected at least one WouldBlock while the child was still writing");
    assert_eq!(lines, vec!["line1", "line2", "line3", "line4", "line5"]);
}

#[test]
fn json_multi_value_mode_reads_a_stream_of_top_level_objects() {
    let text = r#"{"a":1} {"b":2}"#;
    let mut parser = Parser::new("stream", text, MultiValue::whitespace());

    let mut events = Vec::new();
    while let Some(event) = parser.next().unwrap() {
        events.push(event);
    }

    let begins = events.iter().filter(|e| **e == Event::BeginObject).count();
    assert_eq!(begins, 2);
}
