//! Server-rendered HTML pages.

use std::fmt::Write;

use crate::entity::{Note, User};

use super::forms::{FormErrors, LoginForm, NoteForm, SignupForm};
use super::routes;

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn page(title: &str, user: Option<&User>, body: &str) -> String {
    let nav = match user {
        Some(user) => format!(
            r#"<span class="user">{}</span> <a href="{}">Заметки</a> <a href="{}">Добавить</a> <a href="{}">Выйти</a>"#,
            escape(&user.username),
            routes::NOTES_LIST,
            routes::NOTES_ADD,
            routes::LOGOUT
        ),
        None => format!(
            r#"<a href="{}">Войти</a> <a href="{}">Регистрация</a>"#,
            routes::LOGIN,
            routes::SIGNUP
        ),
    };
    format!(
        "<!DOCTYPE html>\n<html lang=\"ru\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<nav><a href=\"{home}\">Главная</a> {nav}</nav>\n<main>\n{body}\n</main>\n</body>\n</html>\n",
        title = escape(title),
        home = routes::HOME,
        nav = nav,
        body = body,
    )
}

fn error_list(errors: &[String], field: Option<&str>) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut out = match field {
        Some(field) => format!(r#"<ul class="errorlist" data-field="{}">"#, field),
        None => r#"<ul class="errorlist nonfield">"#.to_string(),
    };
    for error in errors {
        let _ = write!(out, "<li>{}</li>", escape(error));
    }
    out.push_str("</ul>");
    out
}

fn input(name: &str, label: &str, kind: &str, value: &str, errors: &FormErrors) -> String {
    format!(
        r#"<p><label for="id_{name}">{label}</label>{errors}<input type="{kind}" name="{name}" id="id_{name}" value="{value}"></p>"#,
        name = name,
        label = label,
        errors = error_list(errors.field(name), Some(name)),
        kind = kind,
        value = escape(value),
    )
}

pub fn home(user: Option<&User>) -> String {
    let body = "<h1>Заметки</h1>\n<p>Личные заметки: добавляйте, редактируйте и удаляйте свои записи.</p>";
    page("Главная", user, body)
}

pub fn notes_list(user: &User, notes: &[Note]) -> String {
    let mut body = String::from("<h1>Мои заметки</h1>\n<ul class=\"notes\">\n");
    for note in notes {
        let _ = writeln!(
            body,
            r#"<li class="note"><a href="{}">{}</a></li>"#,
            routes::detail_url(&note.slug),
            escape(&note.title)
        );
    }
    body.push_str("</ul>");
    if notes.is_empty() {
        body.push_str("\n<p class=\"empty\">Заметок пока нет.</p>");
    }
    page("Мои заметки", Some(user), &body)
}

pub fn note_detail(user: &User, note: &Note) -> String {
    let body = format!(
        "<article class=\"note\" data-slug=\"{slug}\">\n<h1>{title}</h1>\n<div class=\"text\">{text}</div>\n<p><a href=\"{edit}\">Редактировать</a> <a href=\"{delete}\">Удалить</a></p>\n</article>",
        slug = escape(&note.slug),
        title = escape(&note.title),
        text = escape(&note.text),
        edit = routes::edit_url(&note.slug),
        delete = routes::delete_url(&note.slug),
    );
    page(&note.title, Some(user), &body)
}

/// Add and edit pages share this form.
pub fn note_form(user: &User, heading: &str, action: &str, form: &NoteForm, errors: &FormErrors) -> String {
    let body = format!(
        "<h1>{heading}</h1>\n<form method=\"post\" action=\"{action}\">\n{non_field}{title}\n<p><label for=\"id_text\">Текст</label>{text_errors}<textarea name=\"text\" id=\"id_text\">{text}</textarea></p>\n{slug}\n<button type=\"submit\">Сохранить</button>\n</form>",
        heading = escape(heading),
        action = escape(action),
        non_field = error_list(errors.non_field(), None),
        title = input("title", "Заголовок", "text", &form.title, errors),
        text_errors = error_list(errors.field("text"), Some("text")),
        text = escape(&form.text),
        slug = input("slug", "Адрес для страницы с заметкой", "text", &form.slug, errors),
    );
    page(heading, Some(user), &body)
}

pub fn delete_confirm(user: &User, note: &Note) -> String {
    let body = format!(
        "<h1>Удалить заметку «{title}»?</h1>\n<form method=\"post\" action=\"{action}\">\n<button type=\"submit\">Удалить</button>\n</form>",
        title = escape(&note.title),
        action = routes::delete_url(&note.slug),
    );
    page("Удаление заметки", Some(user), &body)
}

pub fn success(user: &User) -> String {
    let body = format!(
        "<h1>Успешно!</h1>\n<p>Операция выполнена. <a href=\"{}\">К списку заметок</a></p>",
        routes::NOTES_LIST
    );
    page("Успешно", Some(user), &body)
}

pub fn login(form: &LoginForm, errors: &FormErrors) -> String {
    let next = form
        .next
        .as_deref()
        .map(|next| format!(r#"<input type="hidden" name="next" value="{}">"#, escape(next)))
        .unwrap_or_default();
    let body = format!(
        "<h1>Вход</h1>\n<form method=\"post\" action=\"{action}\">\n{non_field}{username}\n{password}\n{next}\n<button type=\"submit\">Войти</button>\n</form>",
        action = routes::LOGIN,
        non_field = error_list(errors.non_field(), None),
        username = input("username", "Имя пользователя", "text", &form.username, errors),
        password = input("password", "Пароль", "password", "", errors),
        next = next,
    );
    page("Вход", None, &body)
}

pub fn signup(form: &SignupForm, errors: &FormErrors) -> String {
    let body = format!(
        "<h1>Регистрация</h1>\n<form method=\"post\" action=\"{action}\">\n{username}\n{password1}\n{password2}\n<button type=\"submit\">Зарегистрироваться</button>\n</form>",
        action = routes::SIGNUP,
        username = input("username", "Имя пользователя", "text", &form.username, errors),
        password1 = input("password1", "Пароль", "password", "", errors),
        password2 = input("password2", "Подтверждение пароля", "password", "", errors),
    );
    page("Регистрация", None, &body)
}

pub fn logged_out() -> String {
    let body = format!(
        "<h1>Вы вышли из системы</h1>\n<p><a href=\"{}\">Войти снова</a></p>",
        routes::LOGIN
    );
    page("Выход", None, &body)
}

pub fn not_found(user: Option<&User>) -> String {
    page("Не найдено", user, "<h1>Страница не найдена</h1>")
}

pub fn server_error() -> String {
    page("Ошибка", None, "<h1>Внутренняя ошибка сервера</h1>")
}
