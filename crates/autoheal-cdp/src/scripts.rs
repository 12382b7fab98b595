//! Page library injected into the top-level document of every window.
//!
//! All evaluation happens in the top-level context: frames are reached
//! through `contentDocument` (same-origin only) and shadow trees through
//! `shadowRoot` (open roots only). Node handles are indices into a registry
//! kept on the top window, so a navigation invalidates every handle.
//!
//! Errors are thrown with a marker prefix (`STALE:`, `XORIGIN:`,
//! `NOTACTIONABLE:`) that the driver maps onto `DriverError` variants.

use autoheal_protocols::{FramePath, NodeHandle, NodeQuery, NodeScript, ScopeRoot};
use serde_json::{Value, json};

const LIBRARY: &str = r#"
if (!window.__autoheal) {
  window.__autoheal = (function () {
    const nodes = [];
    const ids = new WeakMap();
    const FRAME_SEL = 'iframe,frame';
    const SELECTORS = {
      interactive: 'a,button,input:not([type=hidden]),select,textarea,summary,label,' +
        '[role=button],[role=tab],[role=menuitem],[role=link],[role=checkbox],[role=radio],' +
        '[role=option],[role=switch],[onclick],[ng-click],[data-action],[tabindex]',
      fillable: 'input:not([type=hidden]):not([type=submit]):not([type=button]):not([type=checkbox])' +
        ':not([type=radio]):not([type=image]):not([type=reset]):not([type=file]),textarea,' +
        '[contenteditable=""],[contenteditable=true],[role=textbox],[role=searchbox]',
      selectable: 'select,[role=listbox],[role=combobox]',
      overlay_containers: '[role=dialog],[role=alertdialog],[aria-modal=true],[class*=modal],' +
        '[class*=overlay],[class*=dialog],[class*=popup]'
    };
    const CLICK_ATTRS = ['onclick', 'ng-click', 'v-on:click', '@click', 'data-action', 'jsaction'];
    const WALK_CAP = 6000;

    function fail(marker, detail) { throw new Error(marker + detail); }

    function register(el) {
      let id = ids.get(el);
      if (id === undefined) { id = nodes.length; nodes.push(el); ids.set(el, id); }
      return 'n' + id;
    }

    function node(handle) {
      const el = nodes[parseInt(String(handle).slice(1), 10)];
      if (!el || !el.isConnected) fail('STALE:', handle);
      return el;
    }

    function frameElements(doc) { return Array.from(doc.querySelectorAll(FRAME_SEL)); }

    function frameDoc(el, label) {
      let doc = null;
      try { doc = el.contentDocument; } catch (e) { fail('XORIGIN:', label); }
      if (!doc) fail('XORIGIN:', label);
      return doc;
    }

    function resolveDoc(path) {
      let doc = document;
      for (let i = 0; i < path.length; i++) {
        const el = frameElements(doc)[path[i]];
        if (!el) fail('STALE:', 'frame ' + path.slice(0, i + 1).join('/'));
        doc = frameDoc(el, 'frame ' + path.slice(0, i + 1).join('/'));
      }
      return doc;
    }

    function resolveRoot(path, root) {
      const doc = resolveDoc(path);
      if (!root || root.kind === 'document') return doc;
      if (root.kind === 'element') return node(root.handles);
      let cur = doc;
      for (const h of root.handles) {
        const host = node(h);
        if (!host.shadowRoot) fail('STALE:', 'shadow root of ' + h);
        cur = host.shadowRoot;
      }
      return cur;
    }

    function styleOf(el) {
      try { return el.ownerDocument.defaultView.getComputedStyle(el); } catch (e) { return null; }
    }

    function isVisible(el) {
      const r = el.getBoundingClientRect();
      if (r.width <= 0 || r.height <= 0) return false;
      const s = styleOf(el);
      return !s || (s.visibility !== 'hidden' && s.display !== 'none' && s.opacity !== '0');
    }

    function clean(text) { return (text || '').replace(/\s+/g, ' ').trim(); }

    function ownText(el) {
      let t = '';
      for (const c of el.childNodes) { if (c.nodeType === 3) t += ' ' + c.textContent; }
      return clean(t);
    }

    function visibleText(el) {
      const tag = el.tagName.toLowerCase();
      if (tag === 'input') {
        const type = (el.getAttribute('type') || '').toLowerCase();
        if (['submit', 'button', 'reset'].includes(type)) return clean(el.value);
        return '';
      }
      if (tag === 'select' || tag === 'textarea') return '';
      return clean(el.innerText !== undefined ? el.innerText : el.textContent).slice(0, 500);
    }

    function labelsOf(el) {
      const out = { explicit: null, wrapping: null, preceding: null };
      const doc = el.getRootNode ? el.getRootNode() : el.ownerDocument;
      if (el.id && doc.querySelector) {
        try {
          const l = doc.querySelector('label[for="' + CSS.escape(el.id) + '"]');
          if (l) out.explicit = clean(l.textContent);
        } catch (e) {}
      }
      const wrap = el.closest ? el.closest('label') : null;
      if (wrap) out.wrapping = clean(wrap.textContent);
      let prev = el.previousSibling;
      while (prev && prev.nodeType === 3 && !clean(prev.textContent)) prev = prev.previousSibling;
      if (prev) {
        const t = clean(prev.textContent);
        const tag = prev.nodeType === 1 ? prev.tagName.toLowerCase() : '#text';
        if (t && t.length <= 60 && ['#text', 'label', 'span', 'b', 'strong', 'div', 'p', 'td', 'th'].includes(tag)) {
          out.preceding = t;
        }
      }
      return out;
    }

    function snapshot(el, order) {
      const r = el.getBoundingClientRect();
      const s = styleOf(el);
      const z = s ? parseInt(s.zIndex, 10) : 0;
      return {
        handle: register(el),
        tag: el.tagName.toLowerCase(),
        attributes: Array.from(el.attributes).map(a => [a.name, a.value]),
        text: visibleText(el) || ownText(el),
        labels: labelsOf(el),
        cursorPointer: !!s && s.cursor === 'pointer',
        hasClickHandler: typeof el.onclick === 'function' || CLICK_ATTRS.some(a => el.hasAttribute(a)),
        width: r.width,
        height: r.height,
        visible: isVisible(el),
        position: s ? s.position : 'static',
        zIndex: isNaN(z) ? 0 : z,
        hasShadowRoot: !!el.shadowRoot,
        order: order
      };
    }

    function allElements(root) {
      return Array.from(root.querySelectorAll('*')).slice(0, WALK_CAP);
    }

    function query(path, root, kind) {
      const scope = resolveRoot(path, root);
      let found;
      if (kind === 'shadow_hosts') {
        found = allElements(scope).filter(el => !!el.shadowRoot);
      } else if (kind === 'interactive') {
        const sel = SELECTORS.interactive;
        found = allElements(scope).filter(el => {
          if (el.matches(sel)) return true;
          const s = styleOf(el);
          return !!s && s.cursor === 'pointer' && (!el.parentElement || styleOf(el.parentElement).cursor !== 'pointer');
        });
      } else if (kind === 'overlay_containers') {
        const sel = SELECTORS.overlay_containers;
        found = allElements(scope).filter(el => {
          if (el.matches(sel)) return true;
          const s = styleOf(el);
          return !!s && (s.position === 'fixed' || s.position === 'absolute') && parseInt(s.zIndex, 10) >= 100;
        });
      } else {
        found = Array.from(scope.querySelectorAll(SELECTORS[kind]));
      }
      return found.map((el, i) => snapshot(el, i));
    }

    function frames(path) {
      const doc = resolveDoc(path);
      return frameElements(doc).map((el, i) => ({
        index: i,
        name: el.getAttribute('name') || el.getAttribute('id'),
        src: el.getAttribute('src')
      }));
    }

    function deepScan(needle, limit) {
      const want = String(needle).toLowerCase();
      const roots = [document];
      const out = [];
      let seen = 0;
      while (roots.length && seen < limit) {
        const root = roots.shift();
        for (const el of root.querySelectorAll('*')) {
          if (++seen > limit) break;
          if (el.shadowRoot) roots.push(el.shadowRoot);
          if (el.matches(FRAME_SEL)) {
            try { if (el.contentDocument) roots.push(el.contentDocument); } catch (e) {}
            continue;
          }
          let hay = ownText(el).toLowerCase();
          for (const a of el.attributes) { if (a.name !== 'style') hay += ' ' + a.value.toLowerCase(); }
          if (el.value && typeof el.value === 'string') hay += ' ' + el.value.toLowerCase();
          if (hay.includes(want)) out.push(snapshot(el, out.length));
        }
      }
      return out;
    }

    function frameOffset(el) {
      let x = 0, y = 0;
      let win = el.ownerDocument.defaultView;
      while (win && win !== window.top) {
        const fe = win.frameElement;
        if (!fe) break;
        const r = fe.getBoundingClientRect();
        x += r.left + fe.clientLeft;
        y += r.top + fe.clientTop;
        win = win.parent;
      }
      return { x: x, y: y };
    }

    function isEnabled(el) {
      return !el.disabled && el.getAttribute('aria-disabled') !== 'true';
    }

    function clickPoint(handle, scroll) {
      const el = node(handle);
      if (scroll) el.scrollIntoView({ block: 'center', inline: 'center' });
      const r = el.getBoundingClientRect();
      const cx = r.left + r.width / 2, cy = r.top + r.height / 2;
      let receives = false;
      if (r.width > 0 && r.height > 0) {
        const root = el.getRootNode && el.getRootNode().elementFromPoint ? el.getRootNode() : el.ownerDocument;
        const hit = root.elementFromPoint(cx, cy);
        receives = !!hit && (hit === el || el.contains(hit) || (hit.shadowRoot && hit.shadowRoot.contains(el)));
      }
      const off = frameOffset(el);
      return { x: cx + off.x, y: cy + off.y, visible: isVisible(el), receivesEvents: receives, enabled: isEnabled(el) };
    }

    function fire(el, type, init) {
      const opts = Object.assign({ bubbles: true, cancelable: true, composed: true }, init || {});
      const view = el.ownerDocument.defaultView;
      let ev;
      if (type.startsWith('pointer') && view.PointerEvent) ev = new view.PointerEvent(type, opts);
      else if (type.startsWith('mouse') || type === 'click') ev = new view.MouseEvent(type, opts);
      else if (type === 'focus' || type === 'blur') ev = new view.FocusEvent(type, opts);
      else ev = new view.Event(type, opts);
      el.dispatchEvent(ev);
    }

    function setNativeValue(el, value) {
      const view = el.ownerDocument.defaultView;
      const proto = el.tagName === 'TEXTAREA' ? view.HTMLTextAreaElement.prototype
        : el.tagName === 'SELECT' ? view.HTMLSelectElement.prototype
        : view.HTMLInputElement.prototype;
      const desc = Object.getOwnPropertyDescriptor(proto, 'value');
      if (el.isContentEditable) el.textContent = value;
      else if (desc && desc.set) desc.set.call(el, value);
      else el.value = value;
    }

    function prepareFill(handle, force) {
      const el = node(handle);
      if (!force) {
        if (!isVisible(el)) fail('NOTACTIONABLE:', 'not visible');
        if (!isEnabled(el)) fail('NOTACTIONABLE:', 'disabled');
        if (el.readOnly) fail('NOTACTIONABLE:', 'read-only');
      }
      el.scrollIntoView({ block: 'center', inline: 'center' });
      el.focus();
      if (force) { setNativeValue(el, ''); fire(el, 'input'); }
      if (el.isContentEditable) {
        const range = el.ownerDocument.createRange();
        range.selectNodeContents(el);
        const sel = el.ownerDocument.defaultView.getSelection();
        sel.removeAllRanges();
        sel.addRange(range);
      } else if (typeof el.select === 'function') {
        el.select();
      }
      return true;
    }

    function commitFill(handle) {
      const el = node(handle);
      fire(el, 'change');
      return el.isContentEditable ? clean(el.textContent) : String(el.value === undefined ? '' : el.value);
    }

    function chooseOption(el, value) {
      const want = clean(value).toLowerCase();
      const opts = Array.from(el.options || []);
      const opt = opts.find(o => o.value === value) ||
        opts.find(o => clean(o.textContent).toLowerCase() === want) ||
        opts.find(o => clean(o.textContent).toLowerCase().includes(want));
      if (!opt) fail('NOTACTIONABLE:', 'no option ' + value);
      el.focus();
      setNativeValue(el, opt.value);
      opt.selected = true;
      fire(el, 'input');
      fire(el, 'change');
      return true;
    }

    function selectOption(handle, value, force) {
      const el = node(handle);
      if (!force) {
        if (!isVisible(el)) fail('NOTACTIONABLE:', 'not visible');
        if (!isEnabled(el)) fail('NOTACTIONABLE:', 'disabled');
      }
      if (el.tagName === 'SELECT') return chooseOption(el, value);
      el.click();
      const want = clean(value).toLowerCase();
      const scope = el.ownerDocument;
      const owned = el.getAttribute('aria-controls') || el.getAttribute('aria-owns');
      const list = (owned && scope.getElementById(owned)) || scope;
      const opt = Array.from(list.querySelectorAll('[role=option]'))
        .find(o => clean(o.textContent).toLowerCase() === want);
      if (!opt) fail('NOTACTIONABLE:', 'no option ' + value);
      opt.click();
      return true;
    }

    function runScript(handle, script) {
      const el = node(handle);
      switch (script.kind) {
        case 'set_value_with_events':
          fire(el, 'focus'); if (el.focus) el.focus();
          setNativeValue(el, script.value);
          fire(el, 'input'); fire(el, 'change'); fire(el, 'blur');
          return true;
        case 'select_with_events':
          return el.tagName === 'SELECT' ? chooseOption(el, script.value) : selectOption(handle, script.value, true);
        case 'synthetic_click':
          if (typeof el.click !== 'function') fail('NOTACTIONABLE:', 'no click accessor');
          el.click();
          return true;
        case 'pointer_sequence': {
          const r = el.getBoundingClientRect();
          const at = { clientX: r.left + r.width / 2, clientY: r.top + r.height / 2, button: 0 };
          for (const t of ['pointerover', 'mouseover', 'pointerdown', 'mousedown', 'pointerup', 'mouseup', 'click']) fire(el, t, at);
          return true;
        }
        case 'dispatch_input':
          setNativeValue(el, script.value);
          fire(el, 'input');
          return true;
      }
      fail('NOTACTIONABLE:', 'unknown script ' + script.kind);
    }

    function countVisible(selector) {
      try { return Array.from(document.querySelectorAll(selector)).filter(isVisible).length; }
      catch (e) { return 0; }
    }

    function readyState(path) { return resolveDoc(path).readyState; }

    function pageText() {
      const parts = [];
      const walk = (doc, depth) => {
        if (doc.body) parts.push(doc.body.innerText || '');
        if (depth >= 5) return;
        for (const f of frameElements(doc)) {
          try { if (f.contentDocument) walk(f.contentDocument, depth + 1); } catch (e) {}
        }
      };
      walk(document, 0);
      return parts.join('\n');
    }

    return { query, frames, deepScan, clickPoint, prepareFill, commitFill, selectOption,
             runScript, countVisible, readyState, pageText };
  })();
}
"#;

/// Build an expression that installs the library and calls `method` with JSON args.
pub fn call(method: &str, args: &[Value]) -> String {
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    format!(
        "{}\nwindow.__autoheal.{}({})",
        LIBRARY,
        method,
        args.join(", ")
    )
}

/// Library name of a query kind.
pub fn query_kind(query: NodeQuery) -> &'static str {
    match query {
        NodeQuery::Interactive => "interactive",
        NodeQuery::Fillable => "fillable",
        NodeQuery::Selectable => "selectable",
        NodeQuery::OverlayContainers => "overlay_containers",
        NodeQuery::ShadowHosts => "shadow_hosts",
    }
}

fn path_arg(path: &FramePath) -> Value {
    json!(path.indices())
}

pub fn query(path: &FramePath, root: &ScopeRoot, kind: NodeQuery) -> String {
    // ScopeRoot serializes as {"kind": ..., "handles": ...}.
    let root = serde_json::to_value(root).unwrap_or(Value::Null);
    call("query", &[path_arg(path), root, json!(query_kind(kind))])
}

pub fn frames(path: &FramePath) -> String {
    call("frames", &[path_arg(path)])
}

pub fn deep_scan(needle: &str, limit: usize) -> String {
    call("deepScan", &[json!(needle), json!(limit)])
}

pub fn click_point(handle: &NodeHandle, scroll: bool) -> String {
    call("clickPoint", &[json!(handle.as_str()), json!(scroll)])
}

pub fn prepare_fill(handle: &NodeHandle, force: bool) -> String {
    call("prepareFill", &[json!(handle.as_str()), json!(force)])
}

pub fn commit_fill(handle: &NodeHandle) -> String {
    call("commitFill", &[json!(handle.as_str())])
}

pub fn select_option(handle: &NodeHandle, value: &str, force: bool) -> String {
    call(
        "selectOption",
        &[json!(handle.as_str()), json!(value), json!(force)],
    )
}

pub fn run_script(handle: &NodeHandle, script: &NodeScript) -> String {
    let script = serde_json::to_value(script).unwrap_or(Value::Null);
    call("runScript", &[json!(handle.as_str()), script])
}

pub fn count_visible(selector: &str) -> String {
    call("countVisible", &[json!(selector)])
}

pub fn ready_state(path: &FramePath) -> String {
    call("readyState", &[path_arg(path)])
}

pub fn page_text() -> String {
    call("pageText", &[])
}

#[cfg(test)]
#[path = "scripts_tests.rs"]
mod tests;
