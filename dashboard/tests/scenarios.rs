use std::cell::Cell;
use std::rc::Rc;

use dashboard::hooks::{
    ApiCall, FileUpload, FormSubmit, PaginatedApi, ProgressReporter,
};
use futures::executor::block_on;
use futures::future::ready;
use payloads::{CallResult, Meta, Params};
use serde_json::json;
use test_helpers::{MockCall, MockListService, Pet, init_test_logging, pets};

fn ids(api: &PaginatedApi<Pet>) -> Vec<i64> {
    api.state().data.iter().map(|pet| pet.id).collect()
}

#[test]
fn test_refresh_then_load_more_reaches_the_last_page() {
    init_test_logging();
    let list = MockListService::<Pet>::scripted();
    list.respond_ok(CallResult::success_with_meta(
        vec![Pet::new(1, "dogs"), Pet::new(2, "cats")],
        Meta {
            has_next: Some(true),
            current_page: Some(1),
            ..Meta::default()
        },
    ));
    list.respond_ok(CallResult::success_with_meta(
        vec![Pet::new(3, "dogs")],
        Meta {
            has_next: Some(false),
            current_page: Some(2),
            ..Meta::default()
        },
    ));
    let api = PaginatedApi::new(list.handler(), Params::new());

    block_on(api.refresh());
    assert_eq!(ids(&api), vec![1, 2]);
    assert!(api.has_more());

    let more = block_on(api.load_more());
    assert!(more.is_some_and(|result| result.is_success()));
    assert_eq!(ids(&api), vec![1, 2, 3]);
    assert!(!api.has_more());

    let pages: Vec<Option<u64>> =
        list.calls().iter().map(Params::page).collect();
    assert_eq!(pages, vec![Some(1), Some(2)]);

    assert!(block_on(api.load_more()).is_none());
    assert_eq!(list.call_count(), 2);
}

#[test]
fn test_filter_survives_paging_and_refresh() {
    init_test_logging();
    let service = MockListService::paged(pets(6), 2).with_filter(
        |pet: &Pet, params: &Params| {
            params
                .get("category")
                .and_then(|c| c.as_str())
                .is_none_or(|c| c == pet.category)
        },
    );
    let api = PaginatedApi::new(service.handler(), Params::new());

    block_on(api.fetch_data(Params::new()));
    block_on(api.update_params(Params::new().with("category", "dogs")));
    assert_eq!(ids(&api), vec![1, 3]);

    block_on(api.load_more());
    assert_eq!(ids(&api), vec![1, 3, 5]);

    block_on(api.refresh());
    assert_eq!(ids(&api), vec![1, 3]);

    let last = service.calls().pop().unwrap_or_default();
    assert_eq!(last.get("category"), Some(&json!("dogs")));
    assert_eq!(last.page(), Some(1));
}

#[test]
fn test_delete_then_refresh_list() {
    init_test_logging();
    let list = MockListService::<Pet>::scripted();
    list.respond_ok(CallResult::success_with_meta(
        pets(2),
        Meta {
            current_page: Some(1),
            has_next: Some(false),
            ..Meta::default()
        },
    ));
    list.respond_ok(CallResult::success(vec![Pet::new(2, "cats")]));
    let table = PaginatedApi::new(list.handler(), Params::new());

    let delete = MockCall::<i64, ()>::new();
    delete.respond_ok(CallResult::success(()));
    let deleted = Rc::new(Cell::new(false));
    let form = {
        let deleted = deleted.clone();
        FormSubmit::new(delete.handler())
            .on_success(move |_| deleted.set(true))
    };

    block_on(table.fetch_data(Params::new()));
    assert_eq!(ids(&table), vec![1, 2]);

    block_on(form.submit(1));
    assert!(deleted.get());
    block_on(table.refresh());

    assert_eq!(ids(&table), vec![2]);
    assert_eq!(delete.calls(), vec![1]);
    assert_eq!(table.state().meta, Meta::default());
}

#[test]
fn test_timeout_on_save_surfaces_once() {
    init_test_logging();
    let save = MockCall::<&'static str, Pet>::new();
    save.respond_err("timeout");
    let errors = Rc::new(Cell::new(0));
    let successes = Rc::new(Cell::new(0));
    let form = {
        let errors = errors.clone();
        let successes = successes.clone();
        FormSubmit::new(save.handler())
            .on_success(move |_| successes.set(successes.get() + 1))
            .on_error(move |result| {
                assert_eq!(result.message(), Some("timeout"));
                errors.set(errors.get() + 1);
            })
    };

    let result = block_on(form.submit("Rex"));

    assert_eq!(result, CallResult::failure("timeout"));
    assert_eq!(errors.get(), 1);
    assert_eq!(successes.get(), 0);
    let state = form.state();
    assert_eq!(state.error.as_deref(), Some("timeout"));
    assert!(!state.loading);
    assert!(!state.success);
}

#[test]
fn test_upload_then_show_in_gallery() {
    init_test_logging();
    let gallery = MockListService::<Pet>::scripted();
    gallery.respond_ok(CallResult::success(vec![Pet::new(9, "cats")]));
    let grid = PaginatedApi::new(gallery.handler(), Params::new());

    let upload = FileUpload::new(
        |file: Vec<u8>, caption: &'static str, progress: ProgressReporter| {
            progress.report(50);
            progress.report(100);
            let pet = Pet::new(file.len() as i64 + 8, caption);
            ready(Ok::<_, anyhow::Error>(CallResult::success(pet)))
        },
    );

    let result = block_on(upload.upload(vec![0xff], "cats"));
    assert_eq!(result.data(), Some(&Pet::new(9, "cats")));
    let state = upload.state();
    assert_eq!(state.progress, 100);
    assert!(state.success);

    block_on(grid.refresh());
    assert_eq!(ids(&grid), vec![9]);
}

#[test]
fn test_detail_view_reload_after_failure() {
    init_test_logging();
    let fetch = MockCall::<(), Pet>::new();
    fetch.respond_err("connection reset");
    fetch.respond_ok(CallResult::success(Pet::new(4, "cats")));
    let detail = ApiCall::new(fetch.handler());

    block_on(detail.execute(()));
    let state = detail.state();
    assert_eq!(state.error.as_deref(), Some("connection reset"));
    assert_eq!(state.data, None);

    block_on(detail.execute(()));
    let state = detail.state();
    assert_eq!(state.error, None);
    assert_eq!(state.data, Some(Pet::new(4, "cats")));
    assert!(!state.loading);
}
