//! String and tag helpers shared by element creation and component
//! resolution.

use std::collections::HashSet;
use std::sync::OnceLock;

const HTML_TAGS: &str = "html,body,base,head,link,meta,style,title,\
address,article,aside,footer,header,h1,h2,h3,h4,h5,h6,hgroup,nav,section,\
div,dd,dl,dt,figcaption,figure,picture,hr,img,li,main,ol,p,pre,ul,\
a,b,abbr,bdi,bdo,br,cite,code,data,dfn,em,i,kbd,mark,q,rp,rt,rtc,ruby,\
s,samp,small,span,strong,sub,sup,time,u,var,wbr,area,audio,map,track,video,\
embed,object,param,source,canvas,script,noscript,del,ins,\
caption,col,colgroup,table,thead,tbody,td,th,tr,\
button,datalist,fieldset,form,input,label,legend,meter,optgroup,option,\
output,progress,select,textarea,\
details,dialog,menu,menuitem,summary,\
content,element,shadow,template,blockquote,iframe,tfoot";

const SVG_TAGS: &str = "svg,animate,circle,clippath,cursor,defs,desc,ellipse,filter,font-face,\
foreignObject,g,glyph,image,line,marker,mask,missing-glyph,path,pattern,\
polygon,polyline,rect,switch,symbol,text,textpath,tspan,use,view";

/// Attribute names with special meaning on vnode data.
const RESERVED_ATTRS: &[&str] = &["key", "ref", "slot", "slot-scope", "is"];

fn tag_set(list: &'static str, cell: &'static OnceLock<HashSet<&'static str>>) -> &'static HashSet<&'static str> {
    cell.get_or_init(|| list.split(',').collect())
}

fn html_tags() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    tag_set(HTML_TAGS, &SET)
}

fn svg_tags() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    tag_set(SVG_TAGS, &SET)
}

/// `true` for built-in HTML and SVG tags.
pub fn is_reserved_tag(tag: &str) -> bool {
    html_tags().contains(tag) || svg_tags().contains(tag)
}

pub fn is_svg_tag(tag: &str) -> bool {
    svg_tags().contains(tag)
}

/// Namespace implied by a tag name, if any.
pub fn get_tag_namespace(tag: &str) -> Option<&'static str> {
    if is_svg_tag(tag) {
        Some("svg")
    } else if tag == "math" {
        Some("math")
    } else {
        None
    }
}

pub fn is_reserved_attribute(name: &str) -> bool {
    RESERVED_ATTRS.contains(&name)
}

/// `myProp` -> `my-prop`
pub fn hyphenate(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.char_indices() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `my-prop` -> `myProp`
pub fn camelize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper = false;
    for c in s.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Split a dot-delimited watch path into segments.
///
/// Returns `None` when the path contains anything other than word
/// characters, `$` and `.`.
pub fn parse_path(path: &str) -> Option<Vec<String>> {
    let valid = path
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.');
    if !valid || path.is_empty() {
        return None;
    }
    Some(path.split('.').map(str::to_owned).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_conversion() {
        assert_eq!(hyphenate("myLongProp"), "my-long-prop");
        assert_eq!(hyphenate("plain"), "plain");
        assert_eq!(camelize("my-long-prop"), "myLongProp");
        assert_eq!(capitalize("myComp"), "MyComp");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn reserved_tags_and_namespaces() {
        assert!(is_reserved_tag("div"));
        assert!(is_reserved_tag("circle"));
        assert!(!is_reserved_tag("my-button"));
        assert_eq!(get_tag_namespace("svg"), Some("svg"));
        assert_eq!(get_tag_namespace("math"), Some("math"));
        assert_eq!(get_tag_namespace("div"), None);
    }

    #[test]
    fn path_parsing() {
        assert_eq!(parse_path("a.b.c").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(parse_path("$data_1").unwrap(), vec!["$data_1"]);
        assert!(parse_path("a[0]").is_none());
        assert!(parse_path("a + b").is_none());
        assert!(parse_path("").is_none());
    }
}
