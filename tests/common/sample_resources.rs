/*!
 * Sample strings.xml documents shared by the tests
 */

/// A typical app resource file
pub const APP_STRINGS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!-- Main strings -->
<resources xmlns:tools="http://schemas.android.com/tools">
    <string name="app_name" translatable="false">Droid Notes</string>
    <string name="greeting">Hello %1$s, you have \n%d items</string>
    <string name='quoted'>Don\'t &amp; won\'t</string>
    <string name="styled">Tap <b>here</b> to continue</string>
    <string name="empty"></string>
    <string name="only_placeholder">%1$d%%</string>

    <string-array name="planets">
        <item>Mercury</item>
        <item>Venus</item>
        <item>Earth</item>
    </string-array>

    <plurals name="notes">
        <item quantity="one">%d note</item>
        <item quantity="other">%d notes</item>
    </plurals>
    <dimen name="margin">16dp</dimen>
</resources>
"#;

/// Default locale for merge tests
pub const BASE_VALUES: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <string name="app_name" translatable="false">Droid Notes</string>
    <string name="title">Notes</string>
    <string name="save">Save</string>
    <plurals name="notes">
        <item quantity="one">%d note</item>
        <item quantity="other">%d notes</item>
    </plurals>
</resources>
"#;

/// Spanish locale adding and overriding entries
pub const SPANISH_VALUES: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <string name="app_name">Notas Droid</string>
    <string name="save">Guardar</string>
    <string name="delete">Borrar</string>
    <plurals name="notes">
        <item quantity="one">%d nota</item>
        <item quantity="many">%d notas</item>
        <item quantity="other">%d notas</item>
    </plurals>
</resources>
"#;

/// Night-mode qualifier directory, never a locale
pub const NIGHT_VALUES: &str = r#"<resources>
    <string name="title">Night Notes</string>
</resources>
"#;
