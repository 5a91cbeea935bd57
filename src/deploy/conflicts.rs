// ABOUTME: Conflict detection between local and remote tracked changes.
// ABOUTME: A conflict is a component changed on both sides since the last sync.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

use crate::components::{ComponentKey, ComponentSet};
use crate::tracking::{ChangeOrigin, TrackedChange};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Conflict {
    pub key: ComponentKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} ({})", self.key, path.display()),
            None => write!(f, "{}", self.key),
        }
    }
}

/// Local changes whose component also changed remotely, limited to `scope` when given.
pub fn find_conflicts(
    changes: &[TrackedChange],
    scope: Option<&ComponentSet>,
) -> Vec<Conflict> {
    let remote: HashSet<&ComponentKey> = changes
        .iter()
        .filter(|c| c.origin == ChangeOrigin::Remote)
        .map(|c| &c.key)
        .collect();

    changes
        .iter()
        .filter(|c| c.origin == ChangeOrigin::Local && remote.contains(&c.key))
        .filter(|c| scope.is_none_or(|set| set.contains(&c.key)))
        .map(|c| Conflict {
            key: c.key.clone(),
            path: c.path.clone(),
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::SourceFile;
    use crate::tracking::ChangeKind;
    use crate::types::ApiVersion;

    fn change(origin: ChangeOrigin, name: &str) -> TrackedChange {
        TrackedChange {
            origin,
            kind: ChangeKind::Modified,
            key: ComponentKey::new("ApexClass", name),
            path: (origin == ChangeOrigin::Local)
                .then(|| PathBuf::from(format!("force-app/main/default/classes/{name}.cls"))),
        }
    }

    #[test]
    fn conflicts_need_both_sides() {
        let changes = vec![
            change(ChangeOrigin::Local, "Foo"),
            change(ChangeOrigin::Local, "Bar"),
            change(ChangeOrigin::Remote, "Foo"),
            change(ChangeOrigin::Remote, "Baz"),
        ];

        let conflicts = find_conflicts(&changes, None);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].key, ComponentKey::new("ApexClass", "Foo"));
        assert_eq!(
            conflicts[0].to_string(),
            "ApexClass:Foo (force-app/main/default/classes/Foo.cls)"
        );
    }

    #[test]
    fn scope_limits_conflicts_to_the_component_set() {
        let changes = vec![
            change(ChangeOrigin::Local, "Foo"),
            change(ChangeOrigin::Remote, "Foo"),
        ];
        let mut set = ComponentSet::new(ApiVersion::default());
        set.add_file(
            ComponentKey::new("ApexClass", "Bar"),
            SourceFile {
                path: PathBuf::from("force-app/main/default/classes/Bar.cls"),
                archive_path: "classes/Bar.cls".to_string(),
            },
        );

        assert!(find_conflicts(&changes, Some(&set)).is_empty());
    }
}
