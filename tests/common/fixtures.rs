//! Control tree fixtures
//!
//! `Shape::Full` is the reference layout. The other variants model the
//! structural drift a template may show between requests.

use postback::tree::{ControlTree, NodeId, NodeSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// profile(naming) > [name, email, newsletter] and a generated-id footer
    Full,
    /// `email` removed
    WithoutEmail,
    /// `email` renamed to `mail`
    RenamedEmail,
    /// children of `profile` in reverse order
    Reordered,
}

#[derive(Debug, Clone, Copy)]
pub struct ProfileForm {
    pub profile: NodeId,
    pub name: NodeId,
    pub email: Option<NodeId>,
    pub newsletter: NodeId,
    pub footer: NodeId,
}

/// Build the profile form with its initialization defaults applied.
pub fn profile_form(shape: Shape) -> (ControlTree, ProfileForm) {
    let mut tree = ControlTree::new("page");
    let root = tree.root();
    let profile = tree.add_child(
        root,
        NodeSpec::new("panel").id("profile").naming_container(),
    );

    let add = |tree: &mut ControlTree, kind: &str, id: &str| {
        tree.add_child(profile, NodeSpec::new(kind).id(id))
    };

    let (name, email, newsletter) = match shape {
        Shape::Full => {
            let name = add(&mut tree, "textbox", "name");
            let email = add(&mut tree, "textbox", "email");
            let newsletter = add(&mut tree, "checkbox", "newsletter");
            (name, Some(email), newsletter)
        }
        Shape::WithoutEmail => {
            let name = add(&mut tree, "textbox", "name");
            let newsletter = add(&mut tree, "checkbox", "newsletter");
            (name, None, newsletter)
        }
        Shape::RenamedEmail => {
            let name = add(&mut tree, "textbox", "name");
            let mail = add(&mut tree, "textbox", "mail");
            let newsletter = add(&mut tree, "checkbox", "newsletter");
            (name, Some(mail), newsletter)
        }
        Shape::Reordered => {
            let newsletter = add(&mut tree, "checkbox", "newsletter");
            let email = add(&mut tree, "textbox", "email");
            let name = add(&mut tree, "textbox", "name");
            (name, Some(email), newsletter)
        }
    };

    let footer = tree.add_child(root, NodeSpec::new("label"));

    tree.set(name, "text", "");
    if let Some(email) = email {
        tree.set(email, "text", "");
    }
    tree.set(newsletter, "checked", false);
    tree.set(footer, "text", "(c) example");

    let form = ProfileForm {
        profile,
        name,
        email,
        newsletter,
        footer,
    };
    (tree, form)
}

/// A Full-shape form after the user typed into it.
pub fn edited_profile_form() -> (ControlTree, ProfileForm) {
    let (mut tree, form) = profile_form(Shape::Full);
    tree.track_subtree(tree.root());
    tree.set(form.name, "text", "Ada");
    if let Some(email) = form.email {
        tree.set(email, "text", "ada@example.com");
    }
    tree.set(form.newsletter, "checked", true);
    tree.set(form.footer, "text", "(c) edited");
    (tree, form)
}
