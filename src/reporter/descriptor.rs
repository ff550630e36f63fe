use crate::models::window::{DescriptorMode, WindowHandle};

/// Builds the semicolon-delimited descriptor for a single window.
pub fn descriptor(window: &WindowHandle, mode: DescriptorMode) -> String {
    match mode {
        DescriptorMode::Full => full_descriptor(window),
        DescriptorMode::NameCaption => name_caption_descriptor(window),
    }
}

/// `<class_or_name>;<caption>;<pid>`
fn full_descriptor(window: &WindowHandle) -> String {
    let mut info = String::new();

    if let Some(app) = window.app_name() {
        info.push_str(app);
    }
    info.push(';');

    if let Some(caption) = window.caption() {
        info.push_str(caption);
    }
    info.push(';');

    if let Some(pid) = window.process_id() {
        info.push_str(&pid.to_string());
    }

    info
}

/// `<name>;<caption>`, with nothing after the separator when there is no caption.
fn name_caption_descriptor(window: &WindowHandle) -> String {
    let mut info = String::new();

    if let Some(name) = window.name() {
        info.push_str(name);
    }
    info.push(';');

    if let Some(caption) = window.caption() {
        info.push_str(caption);
    }

    info
}
