// src/handlers/ui.rs
//! Server-rendered HTML pages. Everything user-supplied goes through
//! [`escape_html`] before it lands in markup.

use crate::models::auth::{ProfileForm, User};
use crate::models::message::{MessageForm, MessageView, UserActivity};

const STYLE: &str = r#"
        * { box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
            background: linear-gradient(135deg, #1a1a2e 0%, #16213e 50%, #0f1419 100%);
            min-height: 100vh;
            margin: 0;
            color: #e8e8e8;
        }
        nav {
            display: flex;
            gap: 1rem;
            align-items: center;
            padding: 1rem 2rem;
            background: rgba(30, 30, 52, 0.8);
            border-bottom: 1px solid rgba(59, 130, 246, 0.3);
        }
        nav a { color: #93c5fd; text-decoration: none; }
        nav .brand { font-weight: bold; color: #f8fafc; margin-right: auto; }
        main {
            max-width: 720px;
            margin: 2rem auto;
            padding: 2rem;
            background: rgba(30, 30, 52, 0.8);
            border: 1px solid rgba(59, 130, 246, 0.3);
            border-radius: 20px;
        }
        h1 { color: #f8fafc; margin-top: 0; }
        label { display: block; margin: 1rem 0 0.4rem; color: #cbd5e1; }
        input[type=text], input[type=password], input[type=email], select, textarea {
            width: 100%;
            padding: 0.7rem;
            border-radius: 8px;
            border: 1px solid rgba(148, 163, 184, 0.4);
            background: rgba(15, 23, 42, 0.6);
            color: #e8e8e8;
        }
        textarea { min-height: 8rem; }
        button {
            margin-top: 1.5rem;
            padding: 0.7rem 1.5rem;
            border: none;
            border-radius: 8px;
            background: #3b82f6;
            color: white;
            cursor: pointer;
        }
        button.danger { background: #dc2626; }
        .errors { background: rgba(220, 38, 38, 0.15); border: 1px solid #dc2626; border-radius: 8px; padding: 0.5rem 1rem; }
        .message { border-bottom: 1px solid rgba(148, 163, 184, 0.2); padding: 0.8rem 0; }
        .meta { color: #94a3b8; font-size: 0.85rem; }
        table { width: 100%; border-collapse: collapse; }
        th, td { text-align: left; padding: 0.5rem; border-bottom: 1px solid rgba(148, 163, 184, 0.2); }
        .inline { display: inline; }
        .inline button { margin: 0; padding: 0; background: none; color: #93c5fd; }
"#;

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn nav(current: Option<&User>) -> String {
    match current {
        Some(user) => {
            let admin_link = if user.is_admin() {
                r#"<a href="/admin/">Admin</a>"#
            } else {
                ""
            };
            format!(
                r#"<nav>
        <span class="brand">Letterbox</span>
        <span>Signed in as {}</span>
        <a href="/">New message</a>
        <a href="/readmessage/">Sent</a>
        <a href="/edit-profile/">Profile</a>
        {}
        <form class="inline" method="post" action="/logout/"><button type="submit">Log out</button></form>
    </nav>"#,
                escape_html(&user.username),
                admin_link
            )
        }
        None => r#"<nav>
        <span class="brand">Letterbox</span>
        <a href="/login/">Log in</a>
        <a href="/signup/">Sign up</a>
    </nav>"#
            .to_string(),
    }
}

fn layout(title: &str, current: Option<&User>, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - Letterbox</title>
    <style>{}</style>
</head>
<body>
    {}
    <main>
{}
    </main>
</body>
</html>"#,
        escape_html(title),
        STYLE,
        nav(current),
        body
    )
}

fn errors_block(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", escape_html(e)))
        .collect();
    format!(r#"<ul class="errors">{}</ul>"#, items)
}

pub fn error_page(title: &str, detail: &str) -> String {
    layout(
        title,
        None,
        &format!("<h1>{}</h1><p>{}</p>", escape_html(title), escape_html(detail)),
    )
}

pub fn login_page(errors: &[String], username: &str, remember_me: bool) -> String {
    let body = format!(
        r#"<h1>Log in</h1>
        {}
        <form method="post" action="/login/">
            <label for="username">Username</label>
            <input type="text" id="username" name="username" value="{}" autofocus required>
            <label for="password">Password</label>
            <input type="password" id="password" name="password" required>
            <label><input type="checkbox" name="remember_me"{}> Remember me</label>
            <button type="submit">Log in</button>
        </form>
        <p>No account yet? <a href="/signup/">Sign up</a></p>"#,
        errors_block(errors),
        escape_html(username),
        if remember_me { " checked" } else { "" }
    );
    layout("Log in", None, &body)
}

pub fn signup_page(errors: &[String], username: &str) -> String {
    let body = format!(
        r#"<h1>Sign up</h1>
        {}
        <form method="post" action="/signup/">
            <label for="username">Username</label>
            <input type="text" id="username" name="username" value="{}" maxlength="150" autofocus required>
            <label for="password1">Password</label>
            <input type="password" id="password1" name="password1" required>
            <label for="password2">Password confirmation</label>
            <input type="password" id="password2" name="password2" required>
            <button type="submit">Create account</button>
        </form>
        <p>Already registered? <a href="/login/">Log in</a></p>"#,
        errors_block(errors),
        escape_html(username)
    );
    layout("Sign up", None, &body)
}

pub fn edit_profile_page(current: &User, form: &ProfileForm, errors: &[String]) -> String {
    let body = format!(
        r#"<h1>Edit profile</h1>
        {}
        <form method="post" action="/edit-profile/">
            <label for="username">Username</label>
            <input type="text" id="username" name="username" value="{}" maxlength="150" required>
            <label for="email">Email address</label>
            <input type="email" id="email" name="email" value="{}">
            <label for="first_name">First name</label>
            <input type="text" id="first_name" name="first_name" value="{}" maxlength="150">
            <label for="last_name">Last name</label>
            <input type="text" id="last_name" name="last_name" value="{}" maxlength="150">
            <button type="submit">Save</button>
        </form>
        <p><a href="/delete-account/">Delete account</a></p>"#,
        errors_block(errors),
        escape_html(&form.username),
        escape_html(&form.email),
        escape_html(&form.first_name),
        escape_html(&form.last_name)
    );
    layout("Edit profile", Some(current), &body)
}

pub fn delete_account_page(current: &User) -> String {
    let body = format!(
        r#"<h1>Delete account</h1>
        <p>Are you sure you want to delete the account <strong>{}</strong>?
        Every message you sent or received will be deleted with it.</p>
        <form method="post" action="/delete-account/">
            <button type="submit" class="danger">Yes, delete my account</button>
        </form>
        <p><a href="/edit-profile/">Cancel</a></p>"#,
        escape_html(&current.username)
    );
    layout("Delete account", Some(current), &body)
}

pub fn compose_page(
    current: &User,
    recipients: &[User],
    form: &MessageForm,
    errors: &[String],
) -> String {
    let options: String = recipients
        .iter()
        .map(|user| {
            let selected = if form.to_user.trim() == user.id.to_string() {
                " selected"
            } else {
                ""
            };
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                user.id,
                selected,
                escape_html(&user.username)
            )
        })
        .collect();

    let body = format!(
        r#"<h1>New message</h1>
        {}
        <form method="post" action="/">
            <label for="to_user">To</label>
            <select id="to_user" name="to_user" required>
                <option value="">---------</option>
                {}
            </select>
            <label for="description">Message</label>
            <textarea id="description" name="description" required>{}</textarea>
            <button type="submit">Send</button>
        </form>"#,
        errors_block(errors),
        options,
        escape_html(&form.description)
    );
    layout("New message", Some(current), &body)
}

fn message_items(messages: &[MessageView], incoming: bool) -> String {
    if messages.is_empty() {
        return "<p>No messages yet.</p>".to_string();
    }
    messages
        .iter()
        .map(|m| {
            // link to the conversation partner on the other end
            let (direction, partner_id, partner) = if incoming {
                ("From", m.user_id, &m.sender_username)
            } else {
                ("To", m.to_user_id, &m.recipient_username)
            };
            format!(
                r#"<div class="message">
            <div class="meta">{} <a href="/readmessage/{}">{}</a> &middot; {}</div>
            <p>{}</p>
        </div>"#,
                direction,
                partner_id,
                escape_html(partner),
                m.created_at.format("%Y-%m-%d %H:%M UTC"),
                escape_html(&m.description)
            )
        })
        .collect()
}

/// Messages the current user sent, under a single heading.
pub fn message_list_page(current: &User, heading: &str, messages: &[MessageView]) -> String {
    let body = format!(
        "<h1>{}</h1>\n        {}",
        escape_html(heading),
        message_items(messages, false)
    );
    layout(heading, Some(current), &body)
}

/// Inbox and outbox of the current user.
pub fn mailbox_page(current: &User, received: &[MessageView], sent: &[MessageView]) -> String {
    let body = format!(
        r#"<h1>Messages</h1>
        <h2>Received</h2>
        {}
        <h2>Sent</h2>
        {}"#,
        message_items(received, true),
        message_items(sent, false)
    );
    layout("Messages", Some(current), &body)
}

pub fn admin_page(current: &User, rows: &[UserActivity]) -> String {
    let table_rows: String = rows
        .iter()
        .map(|row| {
            let role = match (row.is_superuser, row.is_staff) {
                (true, _) => "superuser",
                (false, true) => "staff",
                _ => "user",
            };
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                row.id,
                escape_html(&row.username),
                escape_html(&row.email),
                role,
                row.sent,
                row.received
            )
        })
        .collect();

    let body = format!(
        r#"<h1>Administration</h1>
        <p>{} registered users.</p>
        <table>
            <thead><tr><th>ID</th><th>Username</th><th>Email</th><th>Role</th><th>Sent</th><th>Received</th></tr></thead>
            <tbody>{}</tbody>
        </table>"#,
        rows.len(),
        table_rows
    );
    layout("Administration", Some(current), &body)
}
