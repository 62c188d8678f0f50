use crate::types::QuickLink;

const DEFAULTS: [(&str, &str, &str); 6] = [
    ("github", "GitHub", "https://github.com"),
    ("stackoverflow", "Stack Overflow", "https://stackoverflow.com"),
    ("mdn", "MDN Web Docs", "https://developer.mozilla.org"),
    ("vue", "Vue.js", "https://vuejs.org"),
    ("tailwind", "Tailwind CSS", "https://tailwindcss.com"),
    ("vite", "Vite", "https://vitejs.dev"),
];

/// Набор ссылок для первого запуска. Иконка совпадает с id.
pub fn default_links() -> Vec<QuickLink> {
    DEFAULTS
        .iter()
        .map(|(id, name, url)| QuickLink {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            icon: Some(id.to_string()),
        })
        .collect()
}
