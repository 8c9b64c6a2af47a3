use campus_library::{
    PreviewAssets,
    models::{AcademicLevel, Course, Department, Faculty},
    preview::PreviewCard,
};

fn faculty() -> Faculty {
    Faculty {
        id: 1,
        full_name: "Faculty of Engineering".into(),
        short_name: "FENG".into(),
        description: None,
    }
}

fn department() -> Department {
    Department {
        id: 10,
        faculty_id: 1,
        full_name: "Computer Engineering".into(),
        short_name: "CPE".into(),
        description: Some("Hardware meets software".into()),
    }
}

fn level() -> AcademicLevel {
    AcademicLevel {
        id: 100,
        department_id: 10,
        level_number: 300,
    }
}

#[test]
fn test_missing_faculty_falls_back() {
    let card = PreviewCard::faculty(None);

    assert_eq!(card.title, "Faculty");
    assert_eq!(card.badge_detail, None);
    assert_eq!(card.description, "Explore departments and courses");
}

#[test]
fn test_faculty_without_description_uses_default_copy() {
    let card = PreviewCard::faculty(Some(&faculty()));

    assert_eq!(card.title, "Faculty of Engineering");
    assert_eq!(card.badge_detail.as_deref(), Some("FENG"));
    assert_eq!(card.description, "Explore departments and courses");
}

#[test]
fn test_department_breadcrumb() {
    let card = PreviewCard::department(Some(&faculty()), Some(&department()));

    assert_eq!(card.breadcrumb, ["Faculty of Engineering", "Department"]);
    assert_eq!(card.title, "Computer Engineering");
    assert_eq!(card.description, "Hardware meets software");
}

#[test]
fn test_level_course_count_is_pluralized() {
    let one = PreviewCard::level(Some(&faculty()), Some(&department()), Some(&level()), 1);
    let many = PreviewCard::level(Some(&faculty()), Some(&department()), Some(&level()), 2);
    let none = PreviewCard::level(Some(&faculty()), Some(&department()), Some(&level()), 0);

    assert_eq!(one.badge_detail.as_deref(), Some("1 course"));
    assert_eq!(many.badge_detail.as_deref(), Some("2 courses"));
    assert_eq!(none.badge_detail.as_deref(), Some("0 courses"));
    assert_eq!(one.title, "300 Level Courses");
    assert_eq!(
        one.description,
        "Explore all courses and resources for 300 Level in Computer Engineering"
    );
}

#[test]
fn test_missing_course_falls_back() {
    let card = PreviewCard::course(Some(&department()), Some(&level()), None);

    assert_eq!(card.badge, "COURSE");
    assert_eq!(card.title, "Course");
    assert_eq!(card.badge_detail.as_deref(), Some("300 Level"));
}

#[test]
fn test_long_course_title_is_truncated() {
    let course = Course {
        id: 1000,
        level_id: 100,
        course_code: "CPE 399".into(),
        course_title: "x".repeat(80),
        description: None,
    };

    let card = PreviewCard::course(None, None, Some(&course));

    assert_eq!(card.title, format!("{}...", "x".repeat(60)));
    assert_eq!(card.breadcrumb[0], "Department");
}

#[test]
fn test_rendered_svg_escapes_catalog_text() {
    let mut dept = department();
    dept.full_name = "R&D <Labs>".into();
    let card = PreviewCard::department(Some(&faculty()), Some(&dept));

    let svg = card.render_svg(&PreviewAssets::default());

    assert!(svg.starts_with("<svg"));
    assert!(svg.ends_with("</svg>"));
    assert!(svg.contains("R&amp;D &lt;Labs&gt;"));
    assert!(!svg.contains("<Labs>"));
    assert!(svg.contains("width=\"1200\" height=\"630\""));
}

#[test]
fn test_logo_is_embedded_when_available() {
    let card = PreviewCard::faculty(Some(&faculty()));
    let assets = PreviewAssets {
        site_name: "Engineering Library".into(),
        logo_svg: Some("<svg><circle r=\"4\"/></svg>".into()),
        ..PreviewAssets::default()
    };

    let with_logo = card.render_svg(&assets);
    let without_logo = card.render_svg(&PreviewAssets::default());

    assert!(with_logo.contains("href=\"data:image/svg+xml,"));
    assert!(with_logo.contains("Engineering Library"));
    assert!(!without_logo.contains("data:image/svg+xml"));
    assert!(without_logo.contains("My Campus Library"));
}

#[test]
fn test_card_rasterizes_to_open_graph_png() {
    let card = PreviewCard::level(Some(&faculty()), Some(&department()), Some(&level()), 3);
    let assets = PreviewAssets {
        logo_svg: Some("<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"8\" height=\"8\"><circle cx=\"4\" cy=\"4\" r=\"4\"/></svg>".into()),
        ..PreviewAssets::default()
    };

    let png = card.render_png(&assets).unwrap();

    assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
    assert_eq!(&png[16..20], 1200u32.to_be_bytes());
    assert_eq!(&png[20..24], 630u32.to_be_bytes());
}
