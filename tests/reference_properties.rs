// tests/reference_properties.rs

use std::path::Path;

use proptest::prelude::*;
use stepbox::backend::{ContainerBackend, DockerBackend, SingularityBackend};
use stepbox::fs::mock::MockFileSystem;
use stepbox::image::{ImageResolver, ImageSource, classify};
use stepbox::types::ActionKind;

// Registry handles: non-empty, no whitespace, no scheme separator.
fn handle_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9._/-]{0,30}(:[a-zA-Z0-9._-]{1,10})?"
}

fn backends() -> Vec<Box<dyn ContainerBackend>> {
    vec![Box::new(SingularityBackend::new()), Box::new(DockerBackend::new())]
}

proptest! {
    #[test]
    fn docker_scheme_references_never_touch_the_filesystem(handle in handle_strategy()) {
        let fs = MockFileSystem::new();
        let reference = format!("docker://{handle}");
        for backend in backends() {
            for kind in [ActionKind::Run, ActionKind::Build] {
                let resolved = ImageResolver::new(&fs)
                    .resolve(&reference, backend.as_ref(), kind, Path::new("/work"))
                    .unwrap();
                prop_assert!(resolved.local_identifier.ends_with(handle.as_str()));
            }
        }
        prop_assert_eq!(fs.probe_count(), 0);
    }

    #[test]
    fn hub_references_resolve_without_probing(handle in handle_strategy()) {
        let fs = MockFileSystem::new();
        let reference = format!("shub://{handle}");
        let backend = SingularityBackend::new();
        let resolved = ImageResolver::new(&fs)
            .resolve(&reference, &backend, ActionKind::Run, Path::new("/work"))
            .unwrap();
        prop_assert_eq!(resolved.local_identifier, reference);
        prop_assert_eq!(fs.probe_count(), 0);
    }

    #[test]
    fn classification_is_stable(handle in handle_strategy()) {
        let reference = format!("shub://{handle}");
        let first = classify(&reference).unwrap();
        prop_assert_eq!(&first, &classify(&reference).unwrap());
        prop_assert_eq!(first, ImageSource::RegistryHub(handle));
    }
}
