//! Browser host on top of `web_sys`
//!
//! Mutation batches come from a `MutationObserver` whose callback feeds a relay.
//! Click handlers go through the `onclick` property, which holds exactly one
//! function, so assigning it again drops the previous handler.

use super::{ChangeListener, ClickHandler, Display, Host, MutationBatch, MutationKind, MutationRecord, ObserveOptions};
use crate::dataflow::{Relay, Subscription};
use crate::error::{ContractViolation, RewireError};
use crate::selector::Selector;
use futures::future::LocalFutureObj;
use futures::task::{LocalSpawn, SpawnError};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CustomEvent, CustomEventInit, Element, Event, HtmlElement, HtmlInputElement,
    MutationObserver, MutationObserverInit, NodeList, Window,
};

#[derive(Debug, Clone)]
pub struct BrowserHost {
    window: Window,
    root: Element,
}

impl BrowserHost {
    pub fn from_window() -> Result<Self, RewireError> {
        let window = web_sys::window().ok_or_else(|| RewireError::Host("no window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| RewireError::Host("window has no document".into()))?;
        let root = document
            .document_element()
            .ok_or_else(|| RewireError::Host("document has no root element".into()))?;
        Ok(Self { window, root })
    }
}

fn js_error(context: &str, value: JsValue) -> RewireError {
    RewireError::Host(format!("{context}: {value:?}"))
}

fn html_element(node: &Element) -> Result<&HtmlElement, RewireError> {
    node.dyn_ref::<HtmlElement>()
        .ok_or_else(|| ContractViolation::NotAnElement.into())
}

fn input_element(node: &Element) -> Result<&HtmlInputElement, RewireError> {
    node.dyn_ref::<HtmlInputElement>()
        .ok_or_else(|| ContractViolation::NotAControl.into())
}

fn elements(list: &NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|index| list.item(index))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

fn convert_record(record: web_sys::MutationRecord) -> Option<MutationRecord<Element>> {
    let kind = match record.type_().as_str() {
        "childList" => MutationKind::ChildList,
        "attributes" => MutationKind::Attributes,
        _ => return None,
    };
    let target = record.target()?.dyn_into::<Element>().ok()?;
    Some(MutationRecord {
        kind,
        target,
        added: elements(&record.added_nodes()),
        removed: elements(&record.removed_nodes()),
    })
}

impl Host for BrowserHost {
    type Node = Element;

    fn document_root(&self) -> Element {
        self.root.clone()
    }

    fn query(&self, scope: &Element, selector: &Selector) -> Option<Element> {
        match scope.query_selector(&selector.to_string()) {
            Ok(found) => found,
            Err(error) => {
                log::warn!("querySelector('{selector}') failed: {error:?}");
                None
            }
        }
    }

    fn query_all(&self, scope: &Element, selector: &Selector) -> Vec<Element> {
        match scope.query_selector_all(&selector.to_string()) {
            Ok(list) => elements(&list),
            Err(error) => {
                log::warn!("querySelectorAll('{selector}') failed: {error:?}");
                Vec::new()
            }
        }
    }

    fn first_element_child(&self, node: &Element) -> Option<Element> {
        node.first_element_child()
    }

    fn next_element_sibling(&self, node: &Element) -> Option<Element> {
        node.next_element_sibling()
    }

    fn children(&self, node: &Element) -> Vec<Element> {
        let children = node.children();
        (0..children.length())
            .filter_map(|index| children.item(index))
            .collect()
    }

    fn class_list(&self, node: &Element) -> Vec<String> {
        node.class_name()
            .split_whitespace()
            .map(ToOwned::to_owned)
            .collect()
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn computed_display(&self, node: &Element) -> Display {
        self.window
            .get_computed_style(node)
            .ok()
            .flatten()
            .and_then(|style| style.get_property_value("display").ok())
            .map(|value| Display::parse(&value))
            .unwrap_or(Display::Other(String::new()))
    }

    fn set_inline_display(&self, node: &Element, display: &Display) -> Result<(), RewireError> {
        html_element(node)?
            .style()
            .set_property("display", display.as_css())
            .map_err(|error| js_error("setting display", error))
    }

    fn is_checked(&self, node: &Element) -> Result<bool, RewireError> {
        Ok(input_element(node)?.checked())
    }

    fn set_checked(&self, node: &Element, checked: bool) -> Result<(), RewireError> {
        input_element(node)?.set_checked(checked);
        Ok(())
    }

    fn dispatch_change(&self, node: &Element) -> Result<(), RewireError> {
        let init = CustomEventInit::new();
        init.set_bubbles(true);
        let event = CustomEvent::new_with_event_init_dict("change", &init)
            .map_err(|error| js_error("creating change event", error))?;
        node.dispatch_event(&event)
            .map_err(|error| js_error("dispatching change event", error))?;
        Ok(())
    }

    fn set_click_handler(&self, node: &Element, handler: ClickHandler<Self>) -> Result<(), RewireError> {
        let host = self.clone();
        let closure = Closure::<dyn Fn()>::new(move || {
            if let Err(error) = handler(&host) {
                log::error!("collapse toggle failed: {error}");
                wasm_bindgen::throw_str(&error.to_string());
            }
        });
        // Ownership moves to the JS function; it is collected with the row it was assigned to.
        let function = closure.into_js_value();
        html_element(node)?.set_onclick(Some(function.unchecked_ref()));
        Ok(())
    }

    fn add_change_listener(
        &self,
        node: &Element,
        listener: ChangeListener<Self>,
    ) -> Result<(), RewireError> {
        let host = self.clone();
        let closure = Closure::<dyn Fn(Event)>::new(move |event: Event| {
            if let Some(target) = event.target().and_then(|target| target.dyn_into::<Element>().ok()) {
                listener(&host, &target);
            }
        });
        node.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref())
            .map_err(|error| js_error("adding change listener", error))?;
        // Listeners stay registered for the page lifetime.
        closure.forget();
        Ok(())
    }

    fn observe(&self, target: &Element, options: ObserveOptions) -> Subscription<MutationBatch<Element>> {
        let (relay, receiver) = Relay::new();
        let callback = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
            move |records: js_sys::Array, _observer: MutationObserver| {
                let records = records
                    .iter()
                    .filter_map(|record| record.dyn_into::<web_sys::MutationRecord>().ok())
                    .filter_map(convert_record)
                    .collect();
                relay.send(MutationBatch { records });
            },
        );

        let observer = match MutationObserver::new(callback.as_ref().unchecked_ref()) {
            Ok(observer) => observer,
            Err(error) => {
                log::error!("MutationObserver unavailable: {error:?}");
                return Subscription::detached(receiver);
            }
        };

        let init = MutationObserverInit::new();
        init.set_child_list(options.child_list);
        init.set_subtree(options.subtree);
        init.set_attributes(options.attributes);
        if let Err(error) = observer.observe_with_options(target, &init) {
            log::error!("observing mutations failed: {error:?}");
            return Subscription::detached(receiver);
        }

        Subscription::new(receiver, move || {
            observer.disconnect();
            drop(callback);
        })
    }
}

/// Runs spawned tasks on the browser's microtask queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

// ===== LOGGING =====

/// Forwards `log` records to the browser console.
struct ConsoleLogger;

static CONSOLE_LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&message),
            log::Level::Warn => web_sys::console::warn_1(&message),
            log::Level::Info => web_sys::console::info_1(&message),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&message),
        }
    }

    fn flush(&self) {}
}

/// Install the console logger. Later calls keep the first logger.
pub fn init_logging(level: log::LevelFilter) {
    if log::set_logger(&CONSOLE_LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
