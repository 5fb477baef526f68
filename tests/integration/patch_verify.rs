//! Patch-then-verify scenarios on realistic launch files.

use decl_patcher::{apply, check, plan, ErrorKind, MatchLocation, PatchError, PatchOutcome};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const LAUNCH_FILE: &str = r#"#!/usr/bin/env python3
"""Launch description for the demo robot."""

from typing import List

DEFAULT_SPEED = 1.0


class Robot:
    """A very small robot."""

    def __init__(self, name: str) -> None:
        self.name = name

    def move(self):
        pass

    @staticmethod
    def describe() -> str:
        return "robot"


def start():
    pass


def move():
    # module-level helper with the same name as the method
    return "module"
"#;

fn fixture(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("launch.py");
    fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn robot_move_returns_true() {
    let (_dir, path) = fixture("class Robot:\n    def move(self):\n        pass\n");

    apply(&path, "move", "def move(self):\n    return True").unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("        return True"));
    assert!(!content.contains("pass"));
    check(&path, "move").unwrap();
}

#[test]
fn module_level_start_is_idempotent() {
    let (_dir, path) = fixture("def start(): pass\n");

    apply(&path, "start", "def start():\n    return 1").unwrap();
    let first = fs::read_to_string(&path).unwrap();
    assert_eq!(first, "def start():\n    return 1\n");

    let outcome = apply(&path, "start", "def start():\n    return 1").unwrap();
    assert!(matches!(outcome, PatchOutcome::AlreadyApplied { .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), first);
}

#[test]
fn missing_name_fails_and_preserves_file() {
    let (_dir, path) = fixture(LAUNCH_FILE);

    let err = apply(&path, "stop_now", "def stop_now():\n    return 0").unwrap_err();

    assert!(matches!(err, PatchError::NotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(fs::read_to_string(&path).unwrap(), LAUNCH_FILE);
}

#[test]
fn class_member_takes_priority_over_later_module_function() {
    let (_dir, path) = fixture(LAUNCH_FILE);

    let outcome = apply(&path, "move", "def move(self):\n    return self.name").unwrap();

    assert_eq!(
        outcome.location(),
        &MatchLocation::ClassMember {
            class: "Robot".to_string(),
            class_index: 3,
            member_index: 2,
        }
    );
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("    def move(self):\n        return self.name\n"));
    assert!(content.contains("def move():\n    # module-level helper"));
}

#[test]
fn class_member_takes_priority_over_earlier_module_function() {
    let source = "def move():\n    return 'module'\n\nclass Robot:\n    def move(self):\n        pass\n";
    let (_dir, path) = fixture(source);

    let outcome = apply(&path, "move", "def move(self):\n    return True").unwrap();

    assert_eq!(
        outcome.location(),
        &MatchLocation::ClassMember {
            class: "Robot".to_string(),
            class_index: 1,
            member_index: 0,
        }
    );
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "def move():\n    return 'module'\n\nclass Robot:\n    def move(self):\n        return True\n"
    );
}

#[test]
fn everything_outside_the_span_is_preserved() {
    let (_dir, path) = fixture(LAUNCH_FILE);

    apply(&path, "start", "def start():\n    return Robot('r2')").unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let expected = LAUNCH_FILE.replace(
        "def start():\n    pass\n",
        "def start():\n    return Robot('r2')\n",
    );
    assert_eq!(content, expected);
}

#[test]
fn decorated_member_replaced_with_decorators() {
    let (_dir, path) = fixture(LAUNCH_FILE);

    apply(
        &path,
        "describe",
        "@classmethod\ndef describe(cls) -> str:\n    return cls.__name__",
    )
    .unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(!content.contains("@staticmethod"));
    assert!(content.contains(
        "    @classmethod\n    def describe(cls) -> str:\n        return cls.__name__\n"
    ));
    check(&path, "describe").unwrap();
}

#[test]
fn replacement_from_file_with_indentation() {
    let (dir, path) = fixture(LAUNCH_FILE);
    let code = dir.path().join("new_init.py");
    fs::write(
        &code,
        "    def __init__(self, name: str, speed: float = 1.0) -> None:\n        self.name = name\n        self.speed = speed\n",
    )
    .unwrap();

    apply(&path, "__init__", code.to_str().unwrap()).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains(
        "    def __init__(self, name: str, speed: float = 1.0) -> None:\n        self.name = name\n        self.speed = speed\n"
    ));
}

#[test]
fn indented_file_replacement_keeps_docstring_content() {
    let (dir, path) = fixture("class Robot:\n    def move(self):\n        pass\n");
    let code = dir.path().join("move.py");
    let replacement = "    def move(self):\n        \"\"\"\n        Doc.\n        \"\"\"\n        pass\n";
    fs::write(&code, replacement).unwrap();

    apply(&path, "move", code.to_str().unwrap()).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        format!("class Robot:\n{replacement}")
    );
    check(&path, "move").unwrap();
}

#[test]
fn replacement_that_breaks_the_file_is_rejected() {
    let (_dir, path) = fixture(LAUNCH_FILE);

    let err = apply(&path, "start", "def start(:\n    return 1").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Parse);
    assert_eq!(fs::read_to_string(&path).unwrap(), LAUNCH_FILE);
}

#[test]
fn non_declaration_replacement_is_a_parse_error() {
    let (_dir, path) = fixture(LAUNCH_FILE);

    let err = apply(&path, "start", "start = lambda: 1").unwrap_err();

    assert!(matches!(err, PatchError::InvalidReplacement { .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), LAUNCH_FILE);
}

#[test]
fn verifier_sees_deeper_than_patcher() {
    let source = "def outer():\n    def inner():\n        pass\n    return inner\n";
    let (_dir, path) = fixture(source);

    assert!(check(&path, "inner").is_ok());
    let err = apply(&path, "inner", "def inner():\n    return 1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn plan_reports_without_writing() {
    let (_dir, path) = fixture(LAUNCH_FILE);

    let plan = plan(&path, "move", "def move(self):\n    return 42").unwrap();

    assert!(!plan.is_noop());
    assert_eq!(plan.original, LAUNCH_FILE);
    assert!(plan.patched.contains("return 42"));
    assert_eq!(fs::read_to_string(&path).unwrap(), LAUNCH_FILE);
}

#[test]
fn replacement_output_reparses() {
    let (_dir, path) = fixture(LAUNCH_FILE);

    apply(
        &path,
        "move",
        "def move(self):\n    doc = \"\"\"\nmoves\n  forward\n\"\"\"\n    return doc",
    )
    .unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("        doc = \"\"\"\nmoves\n  forward\n\"\"\"\n        return doc"));
    decl_patcher::SyntaxTree::parse(content).unwrap();
}
