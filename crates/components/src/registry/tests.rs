use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;
use weft_primitives::RenderMode;

use super::*;
use crate::RenderError;
use crate::testing::FakeRenderer;

const KEYED: &str = "loc1:item-1";
const UNKEYED: &str = "loc1:";

fn registry_with(limit: Option<usize>) -> (Arc<FakeRenderer>, RootComponentRegistry) {
	let renderer = Arc::new(FakeRenderer::new(RenderMode::Server));
	let registry = RootComponentRegistry::new(renderer.clone(), limit);
	(renderer, registry)
}

fn counter(count: i64) -> Parameters {
	Parameters::new().with("count", count)
}

#[tokio::test]
async fn add_attaches_and_renders_once() {
	let (renderer, mut registry) = registry_with(None);
	let id = registry.add("ssr-1", ComponentType::from("Counter"), counter(1), KEYED).await.unwrap();

	let live = renderer.component(id).expect("instance should be live");
	assert_eq!(live.selector, "root:ssr-1");
	assert_eq!(live.renders, vec![counter(1)]);

	let handle = registry.get("ssr-1").unwrap();
	assert_eq!(handle.interactive_id(), id);
	assert!(handle.can_receive_new_parameters());
	assert_eq!(handle.latest_parameters(), &counter(1));
}

#[tokio::test]
async fn add_beyond_limit_is_rejected_and_keeps_first() {
	let (renderer, mut registry) = registry_with(Some(1));
	let first = registry.add("ssr-1", ComponentType::from("Counter"), counter(1), KEYED).await.unwrap();

	let err = registry.add("ssr-2", ComponentType::from("Counter"), counter(2), KEYED).await.unwrap_err();
	assert_eq!(err, RegistryError::CapacityExceeded { limit: 1 });

	assert_eq!(registry.len(), 1);
	assert_eq!(registry.get("ssr-1").map(RootComponentHandle::interactive_id), Some(first));
	assert_eq!(renderer.live_count(), 1);
}

#[tokio::test]
async fn add_with_malformed_key_is_rejected() {
	let (renderer, mut registry) = registry_with(None);
	let err = registry.add("ssr-1", ComponentType::from("Counter"), counter(1), "no-separator").await.unwrap_err();
	assert_eq!(
		err,
		RegistryError::InvalidKey {
			external_id: "ssr-1".into()
		}
	);
	assert!(registry.is_empty());
	assert_eq!(renderer.live_count(), 0);
}

#[tokio::test]
async fn add_duplicate_external_id_is_rejected() {
	let (_renderer, mut registry) = registry_with(None);
	registry.add("ssr-1", ComponentType::from("Counter"), counter(1), KEYED).await.unwrap();
	let err = registry.add("ssr-1", ComponentType::from("Counter"), counter(2), KEYED).await.unwrap_err();
	assert!(matches!(err, RegistryError::AlreadyExists { .. }));
	assert_eq!(registry.get("ssr-1").unwrap().latest_parameters(), &counter(1));
}

#[tokio::test]
async fn failed_initial_render_detaches_instance() {
	let (renderer, mut registry) = registry_with(None);
	renderer.fail_next_renders(1);
	let err = registry.add("ssr-1", ComponentType::from("Counter"), counter(1), KEYED).await.unwrap_err();
	assert!(matches!(err, RegistryError::Render(RenderError::Failed(_))));
	assert!(registry.is_empty());
	assert_eq!(renderer.live_count(), 0);
}

#[tokio::test]
async fn unknown_component_type_surfaces_render_error() {
	let renderer = Arc::new(FakeRenderer::default().with_known_types(["Counter"]));
	let mut registry = RootComponentRegistry::new(renderer, None);
	let err = registry.add("ssr-1", ComponentType::from("Missing"), Parameters::new(), KEYED).await.unwrap_err();
	assert_eq!(err, RegistryError::Render(RenderError::UnknownComponentType(ComponentType::from("Missing"))));
}

#[tokio::test]
async fn update_unknown_component_changes_nothing() {
	let (renderer, mut registry) = registry_with(None);
	registry.add("ssr-1", ComponentType::from("Counter"), counter(1), KEYED).await.unwrap();

	let err = registry.update("ssr-404", counter(9), KEYED).await.unwrap_err();
	assert_eq!(
		err,
		RegistryError::UnknownComponent {
			external_id: "ssr-404".into()
		}
	);
	assert_eq!(registry.len(), 1);
	assert_eq!(registry.get("ssr-1").unwrap().latest_parameters(), &counter(1));
	assert_eq!(renderer.total_renders(), 1);
}

#[tokio::test]
async fn update_with_empty_key_must_still_match_exactly() {
	let (_renderer, mut registry) = registry_with(None);
	registry.add("ssr-1", ComponentType::from("Counter"), counter(1), UNKEYED).await.unwrap();

	let err = registry.update("ssr-1", counter(2), "").await.unwrap_err();
	assert!(matches!(err, RegistryError::KeyMismatch { .. }));
	assert!(registry.update("ssr-1", counter(2), UNKEYED).await.is_ok());
}

#[tokio::test]
async fn keyed_component_rerenders_in_place() {
	let (renderer, mut registry) = registry_with(None);
	let id = registry.add("ssr-1", ComponentType::from("Counter"), counter(1), KEYED).await.unwrap();

	let outcome = registry.update("ssr-1", counter(2), KEYED).await.unwrap();
	assert_eq!(outcome, UpdateOutcome::Rendered);
	assert_eq!(registry.get("ssr-1").unwrap().interactive_id(), id);
	assert_eq!(renderer.component(id).unwrap().renders, vec![counter(1), counter(2)]);

	// Identical parameters still re-render: the component owns that decision.
	let outcome = registry.update("ssr-1", counter(2), KEYED).await.unwrap();
	assert_eq!(outcome, UpdateOutcome::Rendered);
	assert_eq!(renderer.total_renders(), 3);
}

#[tokio::test]
async fn unkeyed_component_skips_identical_parameters() {
	let (renderer, mut registry) = registry_with(None);
	let id = registry.add("ssr-1", ComponentType::from("Counter"), counter(1), UNKEYED).await.unwrap();

	let outcome = registry.update("ssr-1", counter(1), UNKEYED).await.unwrap();
	assert_eq!(outcome, UpdateOutcome::Unchanged);
	assert_eq!(registry.get("ssr-1").unwrap().interactive_id(), id);
	assert_eq!(renderer.total_renders(), 1);
}

#[tokio::test]
async fn unkeyed_component_is_replaced_on_change() {
	let (renderer, mut registry) = registry_with(None);
	let first = registry.add("ssr-1", ComponentType::from("Counter"), counter(1), UNKEYED).await.unwrap();

	let outcome = registry.update("ssr-1", counter(2), UNKEYED).await.unwrap();
	let UpdateOutcome::Replaced { previous, current } = outcome else {
		panic!("expected replacement, got {outcome:?}");
	};
	assert_eq!(previous, first);
	assert_ne!(current, first);
	assert!(!renderer.is_live(first));

	let live = renderer.component(current).unwrap();
	assert_eq!(live.selector, "root:ssr-1");
	assert_eq!(live.component_type, ComponentType::from("Counter"));
	assert_eq!(live.renders, vec![counter(2)]);

	let handle = registry.get("ssr-1").unwrap();
	assert_eq!(handle.interactive_id(), current);
	assert_eq!(handle.latest_parameters(), &counter(2));
}

#[tokio::test]
async fn nested_parameter_values_compare_structurally() {
	let (_renderer, mut registry) = registry_with(None);
	let params = Parameters::new().with("items", json!([{ "id": 1 }, { "id": 2 }]));
	registry.add("ssr-1", ComponentType::from("List"), params.clone(), UNKEYED).await.unwrap();

	let same = Parameters::new().with("items", json!([{ "id": 1 }, { "id": 2 }]));
	assert_eq!(registry.update("ssr-1", same, UNKEYED).await, Ok(UpdateOutcome::Unchanged));

	let reordered = Parameters::new().with("items", json!([{ "id": 2 }, { "id": 1 }]));
	assert!(matches!(
		registry.update("ssr-1", reordered, UNKEYED).await,
		Ok(UpdateOutcome::Replaced { .. })
	));
}

#[tokio::test]
async fn remove_detaches_and_forgets() {
	let (renderer, mut registry) = registry_with(Some(1));
	let id = registry.add("ssr-1", ComponentType::from("Counter"), counter(1), KEYED).await.unwrap();

	let removed = registry.remove("ssr-1").unwrap();
	assert_eq!(removed.interactive_id(), id);
	assert!(!renderer.is_live(id));
	assert!(registry.is_empty());

	assert!(matches!(registry.remove("ssr-1"), Err(RegistryError::UnknownComponent { .. })));
	// Capacity is released.
	registry.add("ssr-2", ComponentType::from("Counter"), counter(1), KEYED).await.unwrap();
}

#[tokio::test]
async fn clear_detaches_everything() {
	let (renderer, mut registry) = registry_with(None);
	for i in 0..3 {
		registry.add(format!("ssr-{i}"), ComponentType::from("Counter"), counter(i), KEYED).await.unwrap();
	}
	assert_eq!(registry.clear(), 3);
	assert!(registry.is_empty());
	assert_eq!(renderer.live_count(), 0);
}

#[tokio::test]
async fn replace_that_cannot_attach_evicts_and_frees_the_slot() {
	let (renderer, mut registry) = registry_with(Some(1));
	registry.add("ssr-1", ComponentType::from("Counter"), counter(1), UNKEYED).await.unwrap();

	renderer.fail_next_adds(1);
	let err = registry.update("ssr-1", counter(2), UNKEYED).await.unwrap_err();
	assert!(matches!(err, RegistryError::Render(RenderError::Failed(_))));
	assert!(!registry.contains("ssr-1"));
	assert_eq!(renderer.live_count(), 0);

	registry.add("ssr-2", ComponentType::from("Counter"), counter(1), UNKEYED).await.unwrap();
	assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn remove_forgets_an_instance_the_renderer_already_dropped() {
	let (renderer, mut registry) = registry_with(Some(1));
	let id = registry.add("ssr-1", ComponentType::from("Counter"), counter(1), KEYED).await.unwrap();
	renderer.remove_root_component(id).unwrap();

	let handle = registry.remove("ssr-1").unwrap();
	assert_eq!(handle.interactive_id(), id);
	assert!(registry.is_empty());
}

#[tokio::test]
async fn failed_replace_render_keeps_old_parameters_and_retries() {
	let (renderer, mut registry) = registry_with(None);
	registry.add("ssr-1", ComponentType::from("Counter"), counter(1), UNKEYED).await.unwrap();

	renderer.fail_next_renders(1);
	assert!(registry.update("ssr-1", counter(2), UNKEYED).await.is_err());
	assert_eq!(registry.get("ssr-1").unwrap().latest_parameters(), &counter(1));

	let UpdateOutcome::Replaced { current, .. } = registry.update("ssr-1", counter(2), UNKEYED).await.unwrap() else {
		panic!("retry should replace the unrendered instance");
	};
	assert_eq!(renderer.component(current).unwrap().renders, vec![counter(2)]);
	assert_eq!(registry.get("ssr-1").unwrap().latest_parameters(), &counter(2));
	assert_eq!(renderer.live_count(), 1);
}

#[tokio::test]
async fn unrendered_replacement_is_not_skipped_for_old_parameters() {
	let (renderer, mut registry) = registry_with(None);
	registry.add("ssr-1", ComponentType::from("Counter"), counter(1), UNKEYED).await.unwrap();

	renderer.fail_next_renders(1);
	assert!(registry.update("ssr-1", counter(2), UNKEYED).await.is_err());

	let outcome = registry.update("ssr-1", counter(1), UNKEYED).await.unwrap();
	let UpdateOutcome::Replaced { current, .. } = outcome else {
		panic!("expected a replace, got {outcome:?}");
	};
	assert_eq!(renderer.component(current).unwrap().renders, vec![counter(1)]);
}

#[tokio::test]
async fn failed_in_place_render_keeps_old_parameters() {
	let (renderer, mut registry) = registry_with(None);
	registry.add("ssr-1", ComponentType::from("Counter"), counter(1), KEYED).await.unwrap();

	renderer.fail_next_renders(1);
	assert!(registry.update("ssr-1", counter(2), KEYED).await.is_err());
	assert_eq!(registry.get("ssr-1").unwrap().latest_parameters(), &counter(1));
}

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
	tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(fut)
}

proptest! {
	#[test]
	fn distinct_keys_always_mismatch(stored in "[a-z0-9]{1,8}:[a-z0-9]{0,8}", presented in ".{0,16}") {
		prop_assume!(stored != presented);
		let result = block_on(async {
			let (_renderer, mut registry) = registry_with(None);
			registry.add("ssr-1", ComponentType::from("Counter"), counter(1), stored.clone()).await.unwrap();
			registry.update("ssr-1", counter(2), &presented).await
		});
		prop_assert!(matches!(result, Err(RegistryError::KeyMismatch { .. })), "expected KeyMismatch, got {:?}", result);
	}
}
