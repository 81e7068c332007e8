use askama::Template;

use crate::{
    api::{
        handlers::user::forms::{EditPassForm, FormErrors, ProfileForm, SigninForm, SignupForm},
        session::{CurrentUser, Flash},
    },
    store::User,
};

/// OpenID providers offered on the sign-in page, `""` meaning "type it in".
const PROVIDERS: &[(&str, &str)] = &[
    ("", "Other"),
    ("google", "Google"),
    ("yahoo", "Yahoo"),
    ("steam", "Steam"),
];

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage<'a> {
    current: &'a CurrentUser,
    flashes: &'a [Flash],
}

pub fn index<'a>(current: &'a CurrentUser, flashes: &'a [Flash]) -> IndexPage<'a> {
    IndexPage { current, flashes }
}

struct ProviderOption {
    value: &'static str,
    label: &'static str,
    selected: bool,
}

#[derive(Template)]
#[template(path = "signin.html")]
pub struct SigninPage<'a> {
    current: &'a CurrentUser,
    flashes: &'a [Flash],
    form: &'a SigninForm,
    errors: &'a FormErrors,
    openid_error: Option<&'a str>,
    remember: bool,
    providers: Vec<ProviderOption>,
}

pub fn signin<'a>(
    current: &'a CurrentUser,
    flashes: &'a [Flash],
    form: &'a SigninForm,
    errors: &'a FormErrors,
    openid_error: Option<&'a str>,
) -> SigninPage<'a> {
    let providers = PROVIDERS
        .iter()
        .map(|&(value, label)| ProviderOption {
            value,
            label,
            selected: value == form.openid_provider,
        })
        .collect();
    SigninPage {
        current,
        flashes,
        form,
        errors,
        openid_error,
        remember: form.remember(),
        providers,
    }
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupPage<'a> {
    current: &'a CurrentUser,
    flashes: &'a [Flash],
    form: &'a SignupForm,
    errors: &'a FormErrors,
}

pub fn signup<'a>(
    current: &'a CurrentUser,
    flashes: &'a [Flash],
    form: &'a SignupForm,
    errors: &'a FormErrors,
) -> SignupPage<'a> {
    SignupPage {
        current,
        flashes,
        form,
        errors,
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfilePage<'a> {
    current: &'a CurrentUser,
    flashes: &'a [Flash],
    user: &'a User,
    /// Only set when the viewer may see it.
    phone: Option<&'a str>,
    own: bool,
}

/// A private phone (`phone_status` 0) is visible to its owner only.
pub fn profile<'a>(current: &'a CurrentUser, flashes: &'a [Flash], user: &'a User) -> ProfilePage<'a> {
    let own = current.user().id == user.id;
    let phone = user
        .info
        .phone
        .as_deref()
        .filter(|_| own || user.info.phone_status == 1);
    ProfilePage {
        current,
        flashes,
        user,
        phone,
        own,
    }
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundPage<'a> {
    current: &'a CurrentUser,
    flashes: &'a [Flash],
}

pub fn not_found<'a>(current: &'a CurrentUser, flashes: &'a [Flash]) -> NotFoundPage<'a> {
    NotFoundPage { current, flashes }
}

/// The form posts through `fetch` and shows the JSON envelope inline.
#[derive(Template)]
#[template(path = "edit.html")]
pub struct EditPage<'a> {
    current: &'a CurrentUser,
    flashes: &'a [Flash],
    form: &'a ProfileForm,
    public: bool,
    no_errors: &'static [String],
}

pub fn edit<'a>(current: &'a CurrentUser, flashes: &'a [Flash], form: &'a ProfileForm) -> EditPage<'a> {
    EditPage {
        current,
        flashes,
        form,
        public: form.phone_status.trim() == "1",
        no_errors: &[],
    }
}

#[derive(Template)]
#[template(path = "edit_pass.html")]
pub struct EditPassPage<'a> {
    current: &'a CurrentUser,
    flashes: &'a [Flash],
    form: &'a EditPassForm,
    errors: &'a FormErrors,
}

pub fn edit_pass<'a>(
    current: &'a CurrentUser,
    flashes: &'a [Flash],
    form: &'a EditPassForm,
    errors: &'a FormErrors,
) -> EditPassPage<'a> {
    EditPassPage {
        current,
        flashes,
        form,
        errors,
    }
}

#[derive(Template)]
#[template(path = "server_error.html")]
pub struct ServerErrorPage;
