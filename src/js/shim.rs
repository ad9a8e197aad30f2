use boa_engine::{Context, JsError, JsString, JsValue, NativeFunction, Source};

use crate::dom::Document;
use crate::flags::Location;
use crate::js::{JsEngineClient, JsEngineExtension};

/// Installs the browser globals a compiled application expects:
/// `window`, `location`, `document` and the animation/performance hooks.
///
/// `document.getElementById` answers from the host [`Document`]. Nodes the
/// application creates form a detached tree inside the engine, enough for a
/// virtual DOM to render and patch during `init`.
pub struct DomExtension {
    document: Document,
    location: Location,
}

impl DomExtension {
    pub fn new(document: Document, location: Location) -> Self {
        Self { document, location }
    }
}

impl JsEngineExtension for DomExtension {
    fn register(&self, context: &mut Context, _client: JsEngineClient) -> Result<(), JsError> {
        // __dom_has_element(id: string) -> boolean
        context.register_global_callable(
            JsString::from("__dom_has_element"),
            1,
            NativeFunction::from_copy_closure_with_captures(
                |_this: &JsValue, args: &[JsValue], document: &Document, _ctx: &mut Context| {
                    let id = args
                        .first()
                        .and_then(|v| v.as_string())
                        .map(|s| s.to_std_string_escaped())
                        .unwrap_or_default();
                    Ok(JsValue::from(document.has_element(&id)))
                },
                self.document.clone(),
            ),
        )?;

        register_environment_shims(context, &self.location)
    }
}

/// Register environment shims for browser compatibility.
fn register_environment_shims(context: &mut Context, location: &Location) -> Result<(), JsError> {
    let shims = format!(
        "globalThis.location = {};\n{}",
        location.to_js_object(),
        ENVIRONMENT_SHIMS
    );

    context.eval(Source::from_bytes(shims.as_bytes()))?;
    log::info!("Environment shims registered for {}", location.href());
    Ok(())
}

const ENVIRONMENT_SHIMS: &str = r#"
(function() {
    // 1. Global Object & Window
    globalThis.window = globalThis;
    globalThis.self = globalThis;

    // 2. Document
    // A detached node tree. Element ids come from the host document; nodes the
    // application renders live only here.
    function HostNode(nodeType, nodeName) {
        this.nodeType = nodeType;
        this.nodeName = nodeName;
        this.tagName = nodeType === 1 ? nodeName : undefined;
        this.childNodes = [];
        this.attributes = [];
        this.parentNode = null;
        this.style = {};
        this.nodeValue = null;
    }

    HostNode.prototype.appendChild = function(child) {
        if (child.parentNode) child.parentNode.removeChild(child);
        this.childNodes.push(child);
        child.parentNode = this;
        return child;
    };

    HostNode.prototype.insertBefore = function(child, reference) {
        if (!reference) return this.appendChild(child);
        if (child.parentNode) child.parentNode.removeChild(child);
        var idx = this.childNodes.indexOf(reference);
        if (idx === -1) throw new Error('insertBefore: reference is not a child');
        this.childNodes.splice(idx, 0, child);
        child.parentNode = this;
        return child;
    };

    HostNode.prototype.removeChild = function(child) {
        var idx = this.childNodes.indexOf(child);
        if (idx !== -1) this.childNodes.splice(idx, 1);
        child.parentNode = null;
        return child;
    };

    HostNode.prototype.replaceChild = function(child, old) {
        var idx = this.childNodes.indexOf(old);
        if (idx === -1) throw new Error('replaceChild: node is not a child');
        if (child.parentNode) child.parentNode.removeChild(child);
        idx = this.childNodes.indexOf(old);
        this.childNodes[idx] = child;
        child.parentNode = this;
        old.parentNode = null;
        return old;
    };

    HostNode.prototype.setAttribute = function(name, value) {
        name = String(name);
        value = String(value);
        for (var i = 0; i < this.attributes.length; i++) {
            if (this.attributes[i].name === name) {
                this.attributes[i].value = value;
                return;
            }
        }
        this.attributes.push({ name: name, value: value });
    };

    HostNode.prototype.setAttributeNS = function(_ns, name, value) {
        this.setAttribute(name, value);
    };

    HostNode.prototype.getAttribute = function(name) {
        for (var i = 0; i < this.attributes.length; i++) {
            if (this.attributes[i].name === name) return this.attributes[i].value;
        }
        return null;
    };

    HostNode.prototype.removeAttribute = function(name) {
        this.attributes = this.attributes.filter(function(a) { return a.name !== name; });
    };

    HostNode.prototype.removeAttributeNS = function(_ns, name) {
        this.removeAttribute(name);
    };

    HostNode.prototype.replaceData = function(offset, count, data) {
        var text = this.nodeValue || '';
        this.nodeValue = text.slice(0, offset) + data + text.slice(offset + count);
    };

    HostNode.prototype.addEventListener = function() {};
    HostNode.prototype.removeEventListener = function() {};

    Object.defineProperty(HostNode.prototype, 'textContent', {
        get: function() {
            if (this.nodeType === 3) return this.nodeValue;
            return this.childNodes.map(function(c) { return c.textContent; }).join('');
        },
        set: function(value) {
            if (this.nodeType === 3) {
                this.nodeValue = String(value);
                return;
            }
            var self = this;
            this.childNodes.forEach(function(c) { c.parentNode = null; });
            this.childNodes = [];
            if (value !== '' && value !== null && value !== undefined) {
                self.appendChild(createTextNode(value));
            }
        }
    });

    Object.defineProperty(HostNode.prototype, 'data', {
        get: function() { return this.nodeValue; },
        set: function(value) { this.nodeValue = String(value); }
    });

    Object.defineProperty(HostNode.prototype, 'length', {
        get: function() { return (this.nodeValue || '').length; }
    });

    Object.defineProperty(HostNode.prototype, 'firstChild', {
        get: function() { return this.childNodes[0] || null; }
    });

    function createElement(tag) {
        return new HostNode(1, String(tag).toUpperCase());
    }

    function createTextNode(text) {
        var node = new HostNode(3, '#text');
        node.nodeValue = String(text);
        return node;
    }

    var body = createElement('body');
    var elements = {};

    globalThis.document = {
        title: '',
        body: body,
        getElementById: function(id) {
            id = String(id);
            if (!__dom_has_element(id)) return null;
            if (!elements[id]) {
                var element = createElement('div');
                element.id = id;
                element.setAttribute('id', id);
                body.appendChild(element);
                elements[id] = element;
            }
            return elements[id];
        },
        createElement: createElement,
        createElementNS: function(_ns, tag) { return createElement(tag); },
        createTextNode: createTextNode,
        createDocumentFragment: function() { return new HostNode(11, '#document-fragment'); },
        addEventListener: function() {},
        removeEventListener: function() {}
    };

    // 3. RequestAnimationFrame (simulated with setTimeout)
    globalThis.requestAnimationFrame = function(callback) {
        return setTimeout(function() { callback(Date.now()); }, 16);
    };

    globalThis.cancelAnimationFrame = function(id) {
        clearTimeout(id);
    };

    // 4. Performance
    if (!globalThis.performance) {
        globalThis.performance = {
            now: function() { return Date.now(); }
        };
    }
})();
"#;
