const BUTTON: &str = "display: inline-block; padding: 10px 20px; background: #1f4e79; color: white; text-decoration: none; border-radius: 4px;";

pub fn render_welcome(name: &str, tenant_name: Option<&str>, base_url: &str) -> String {
    let name = escape(name);
    let tenant_line = match tenant_name {
        Some(tenant) => format!("<p>Tu cuenta pertenece a <strong>{}</strong>.</p>", escape(tenant)),
        None => String::new(),
    };
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Bienvenido a Screener</h2>
    <p>Hola {name},</p>
    <p>Se ha creado tu cuenta para realizar consultas en listas restrictivas.</p>
    {tenant_line}
    <p><a href="{base_url}/auth/login" style="{BUTTON}">Iniciar sesión</a></p>
    <p style="color: #666; font-size: 14px;">Si no esperabas este correo, puedes ignorarlo.</p>
</body>
</html>"#
    )
}

pub fn render_batch_processed(
    name: &str,
    file_name: &str,
    status_label: &str,
    notes: Option<&str>,
    base_url: &str,
) -> String {
    let name = escape(name);
    let file_name = escape(file_name);
    let notes = notes
        .map(|n| format!("<p><strong>Observaciones:</strong> {}</p>", escape(n)))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Tu lote fue procesado</h2>
    <p>Hola {name},</p>
    <p>El archivo <strong>{file_name}</strong> quedó en estado <strong>{status_label}</strong>.</p>
    {notes}
    <p><a href="{base_url}/batches" style="{BUTTON}">Ver mis lotes</a></p>
</body>
</html>"#
    )
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
