use std::cell::RefCell;
use std::rc::Rc;

use app_shell::{Choice, Switcher};
use ts_core::CompanyOverview;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, HtmlButtonElement, MouseEvent};

pub const ITEM_CLASS: &str = "switcher-item";
pub const ACTIVE_CLASS: &str = "switcher-active-item";

pub fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))
}

/// Replace the text of element `id`. Returns false when it is absent.
pub fn set_text(doc: &Document, id: &str, text: &str) -> bool {
    match doc.get_element_by_id(id) {
        Some(el) => {
            el.set_text_content(Some(text));
            true
        }
        None => false,
    }
}

/// Write every overview field into the element of the same id. Missing
/// values clear the text; missing elements are skipped.
pub fn fill_overview(doc: &Document, overview: &CompanyOverview) -> usize {
    overview
        .panel_entries()
        .into_iter()
        .filter(|(id, value)| set_text(doc, id, value.unwrap_or("")))
        .count()
}

/// A row of buttons bound to a [`Switcher`]; `on_select` fires only when the
/// active item actually changes.
pub struct MountedSwitcher<T: Choice + 'static> {
    model: Rc<RefCell<Switcher<T>>>,
    buttons: Rc<Vec<(T, HtmlButtonElement)>>,
}

impl<T: Choice + 'static> MountedSwitcher<T> {
    pub fn mount(
        doc: &Document,
        container_id: &str,
        switcher: Switcher<T>,
        on_select: Rc<dyn Fn(T)>,
    ) -> Result<Self, JsValue> {
        let container = doc
            .get_element_by_id(container_id)
            .ok_or_else(|| JsValue::from_str(&format!("#{container_id} not found")))?;
        container.set_inner_html("");

        let mut buttons = Vec::with_capacity(switcher.items().len());
        for (&item, (label, active)) in switcher.items().iter().zip(switcher.buttons()) {
            let button: HtmlButtonElement = doc.create_element("button")?.dyn_into()?;
            button.set_text_content(Some(label));
            button.set_class_name(ITEM_CLASS);
            if active {
                button.class_list().add_1(ACTIVE_CLASS)?;
            }
            container.append_child(&button)?;
            buttons.push((item, button));
        }

        let mounted = Self {
            model: Rc::new(RefCell::new(switcher)),
            buttons: Rc::new(buttons),
        };
        for (item, button) in mounted.buttons.iter() {
            let item = *item;
            let model = mounted.model.clone();
            let buttons = mounted.buttons.clone();
            let on_select = on_select.clone();
            let closure = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |_: MouseEvent| {
                let changed = model.borrow_mut().click(item);
                if let Some(next) = changed {
                    highlight(&buttons, next);
                    on_select(next);
                }
            }));
            button.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(mounted)
    }

    pub fn active(&self) -> T {
        self.model.borrow().active()
    }

    /// Move the highlight without firing `on_select`, for selections made
    /// outside the buttons.
    pub fn set_active(&self, item: T) {
        if self.model.borrow_mut().click(item).is_some() {
            highlight(&self.buttons, item);
        }
    }
}

fn highlight<T: Choice>(buttons: &[(T, HtmlButtonElement)], active: T) {
    for (item, button) in buttons {
        let classes = button.class_list();
        let _ = if *item == active {
            classes.add_1(ACTIVE_CLASS)
        } else {
            classes.remove_1(ACTIVE_CLASS)
        };
    }
}
