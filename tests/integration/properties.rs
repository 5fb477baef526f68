//! Property tests: idempotent reapplication, scope priority and
//! patcher/verifier agreement.

use decl_patcher::{apply, check, MatchLocation, PatchOutcome};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

fn identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}".prop_filter("python keyword", |name| {
        !matches!(
            name.as_str(),
            "and" | "as" | "assert" | "async" | "await" | "break" | "class" | "continue"
                | "def" | "del" | "elif" | "else" | "except" | "finally" | "for" | "from"
                | "global" | "if" | "import" | "in" | "is" | "lambda" | "nonlocal" | "not"
                | "or" | "pass" | "raise" | "return" | "try" | "while" | "with" | "yield"
                | "match" | "case" | "print" | "exec" | "type"
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn reapplying_yields_identical_bytes(
        name in identifier(),
        value in 0u32..10_000,
        in_class in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("target.py");
        let original = if in_class {
            format!("class Holder:\n    x = 0\n\n    def {name}(self):\n        pass\n")
        } else {
            format!("import os\n\n\ndef {name}():\n    pass\n")
        };
        fs::write(&path, &original).unwrap();

        let params = if in_class { "self" } else { "" };
        let code = format!("def {name}({params}):\n    value = {value}\n    return value\n");

        apply(&path, &name, &code).unwrap();
        let first = fs::read_to_string(&path).unwrap();

        let outcome = apply(&path, &name, &code).unwrap();
        let second = fs::read_to_string(&path).unwrap();

        prop_assert!(
            matches!(outcome, PatchOutcome::AlreadyApplied { .. }),
            "second application should be a no-op"
        );
        prop_assert_eq!(first, second);
        prop_assert!(check(&path, &name).is_ok());
    }

    #[test]
    fn class_member_wins_over_module_function_in_any_order(
        name in identifier(),
        value in 0u32..10_000,
        module_first in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("target.py");
        let module_fn = format!("def {name}():\n    return 'module'\n");
        let class = format!("class Holder:\n    def {name}(self):\n        pass\n");
        let original = if module_first {
            format!("{module_fn}\n\n{class}")
        } else {
            format!("{class}\n\n{module_fn}")
        };
        fs::write(&path, &original).unwrap();

        let code = format!("def {name}(self):\n    return {value}\n");
        let outcome = apply(&path, &name, &code).unwrap();
        let patched = fs::read_to_string(&path).unwrap();

        prop_assert!(
            matches!(
                outcome.location(),
                MatchLocation::ClassMember { class, .. } if class == "Holder"
            ),
            "class member should be patched"
        );
        prop_assert_eq!(
            patched,
            original.replace(
                &format!("    def {name}(self):\n        pass\n"),
                &format!("    def {name}(self):\n        return {value}\n"),
            )
        );
    }
}
