use std::borrow::Cow;
use std::fmt::{Debug, Error as FmtError, Formatter};

/// Names of methods, fields
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.2.2>
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct UnqualifiedName(Cow<'static, str>);

/// Names of classes and interfaces
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.2.1>
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct BinaryName(Cow<'static, str>);

/// Extracts the raw underlying string name
impl AsRef<str> for UnqualifiedName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

/// Extracts the raw underlying string name
impl AsRef<str> for BinaryName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

pub trait Name: Sized {
    /// Check if a string would be a valid name
    fn check_valid(name: impl AsRef<str>) -> Result<(), String>;

    /// Extact the raw underlying string data:
    fn as_cow(&self) -> &Cow<'static, str>;

    /// Extact the raw underlying string name
    fn as_str(&self) -> &str {
        self.as_cow().as_ref()
    }

    /// Try to construct a name from a string
    fn from_string(name: String) -> Result<Self, String>;
}

impl Name for UnqualifiedName {
    fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
        let name = name.as_ref();
        if name == "<init>" || name == "<clinit>" {
            Ok(())
        } else if name.contains(&['.', ';', '[', '/'][..]) {
            Err(format!(
                "Unqualified name '{}' contains an illegal character",
                name
            ))
        } else if name.is_empty() {
            Err(format!("Unqualified name '{}' is empty", name))
        } else {
            Ok(())
        }
    }

    fn as_cow(&self) -> &Cow<'static, str> {
        &self.0
    }

    fn from_string(name: String) -> Result<Self, String> {
        match Self::check_valid(&name) {
            Ok(()) => Ok(UnqualifiedName(Cow::Owned(name))),
            Err(msg) => Err(msg),
        }
    }
}

impl Name for BinaryName {
    fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
        let name = name.as_ref();
        if name.is_empty() {
            Err(format!("Binary name '{}' is empty", name))
        } else {
            name.split('/').map(UnqualifiedName::check_valid).collect()
        }
    }

    fn as_cow(&self) -> &Cow<'static, str> {
        &self.0
    }

    fn from_string(name: String) -> Result<Self, String> {
        match Self::check_valid(&name) {
            Ok(()) => Ok(BinaryName(Cow::Owned(name))),
            Err(msg) => Err(msg),
        }
    }
}

impl Debug for UnqualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}

impl Debug for BinaryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}

impl UnqualifiedName {
    /// Concatenate the contents of two unqualified names to produce a third
    pub fn concat(&self, other: &UnqualifiedName) -> UnqualifiedName {
        UnqualifiedName(Cow::Owned(format!("{}{}", self.as_str(), other.as_str())))
    }

    /// Construct an unqualified name that is just a number
    pub fn number(n: usize) -> UnqualifiedName {
        UnqualifiedName(Cow::Owned(n.to_string()))
    }

    const fn name(value: &'static str) -> UnqualifiedName {
        UnqualifiedName(Cow::Borrowed(value))
    }

    // Special names - only these are allowed to have angle brackets in them
    pub const INIT: Self = Self::name("<init>");
    pub const CLINIT: Self = Self::name("<clinit>");

    // JDK members
    pub const EQUALS: Self = Self::name("equals");
    pub const GETNAME: Self = Self::name("getName");
    pub const VALUEOF: Self = Self::name("valueOf");
    pub const BOOLEANVALUE: Self = Self::name("booleanValue");
    pub const BYTEVALUE: Self = Self::name("byteValue");
    pub const CHARVALUE: Self = Self::name("charValue");
    pub const SHORTVALUE: Self = Self::name("shortValue");
    pub const INTVALUE: Self = Self::name("intValue");
    pub const LONGVALUE: Self = Self::name("longValue");
    pub const FLOATVALUE: Self = Self::name("floatValue");
    pub const DOUBLEVALUE: Self = Self::name("doubleValue");

    // Gson members the optimizer matches or emits calls to
    pub const TOJSON: Self = Self::name("toJson");
    pub const TOJSONTREE: Self = Self::name("toJsonTree");
    pub const FROMJSON: Self = Self::name("fromJson");
    pub const GETADAPTER: Self = Self::name("getAdapter");
    pub const GETRAWTYPE: Self = Self::name("getRawType");
    pub const CREATE: Self = Self::name("create");
    pub const WRITE: Self = Self::name("write");
    pub const READ: Self = Self::name("read");
    pub const VALUE: Self = Self::name("value");
    pub const NAMEMETHOD: Self = Self::name("name");
    pub const BEGINOBJECT: Self = Self::name("beginObject");
    pub const ENDOBJECT: Self = Self::name("endObject");
    pub const HASNEXT: Self = Self::name("hasNext");
    pub const NEXTNAME: Self = Self::name("nextName");
    pub const NEXTBOOLEAN: Self = Self::name("nextBoolean");
    pub const NEXTINT: Self = Self::name("nextInt");
    pub const NEXTLONG: Self = Self::name("nextLong");
    pub const NEXTDOUBLE: Self = Self::name("nextDouble");
    pub const NEXTSTRING: Self = Self::name("nextString");
    pub const SKIPVALUE: Self = Self::name("skipValue");
    pub const ALTERNATE: Self = Self::name("alternate");

    // GsonBuilder configuration methods
    pub const SETVERSION: Self = Self::name("setVersion");
    pub const EXCLUDEFIELDSWITHMODIFIERS: Self = Self::name("excludeFieldsWithModifiers");
    pub const GENERATENONEXECUTABLEJSON: Self = Self::name("generateNonExecutableJson");
    pub const EXCLUDEFIELDSWITHOUTEXPOSEANNOTATION: Self =
        Self::name("excludeFieldsWithoutExposeAnnotation");
    pub const SERIALIZENULLS: Self = Self::name("serializeNulls");
    pub const DISABLEINNERCLASSSERIALIZATION: Self = Self::name("disableInnerClassSerialization");
    pub const SETLONGSERIALIZATIONPOLICY: Self = Self::name("setLongSerializationPolicy");
    pub const SETFIELDNAMINGPOLICY: Self = Self::name("setFieldNamingPolicy");
    pub const SETFIELDNAMINGSTRATEGY: Self = Self::name("setFieldNamingStrategy");
    pub const SETEXCLUSIONSTRATEGIES: Self = Self::name("setExclusionStrategies");
    pub const ADDSERIALIZATIONEXCLUSIONSTRATEGY: Self =
        Self::name("addSerializationExclusionStrategy");
    pub const ADDDESERIALIZATIONEXCLUSIONSTRATEGY: Self =
        Self::name("addDeserializationExclusionStrategy");
    pub const SERIALIZESPECIALFLOATINGPOINTVALUES: Self =
        Self::name("serializeSpecialFloatingPointValues");
    pub const REGISTERTYPEADAPTER: Self = Self::name("registerTypeAdapter");
    pub const REGISTERTYPEADAPTERFACTORY: Self = Self::name("registerTypeAdapterFactory");
    pub const REGISTERTYPEHIERARCHYADAPTER: Self = Self::name("registerTypeHierarchyAdapter");

    // Names we generate (suffixed with the per-class index)
    pub const TOJSONPREFIX: Self = Self::name("toJson$");
    pub const FROMJSONPREFIX: Self = Self::name("fromJson$");
    pub const FROMJSONFIELDPREFIX: Self = Self::name("fromJsonField$");
    pub const FIELDINDEX: Self = Self::name("fieldIndex$");
    pub const GSONFIELD: Self = Self::name("gson");
    pub const CLASSINDEXFIELD: Self = Self::name("classIndex");
}

impl BinaryName {
    /// Concatenate the contents of an unqualified name onto the end of the
    /// binary name to produce a third. If you want a new segment, use `join`
    /// instead.
    pub fn concat(&self, other: &UnqualifiedName) -> BinaryName {
        BinaryName(Cow::Owned(format!("{}{}", self.as_str(), other.as_str())))
    }

    /// Join segments from the other name onto the end of this binary name
    pub fn join(&self, other: impl Name) -> BinaryName {
        BinaryName(Cow::Owned(format!("{}/{}", self.as_str(), other.as_str())))
    }

    /// The `java.lang.Class#getName` style rendering of the name (dots for
    /// slashes), as it appears at runtime
    pub fn dotted(&self) -> String {
        self.as_str().replace('/', ".")
    }

    const fn name(value: &'static str) -> BinaryName {
        BinaryName(Cow::Borrowed(value))
    }

    // JDK names
    pub const OBJECT: Self = Self::name("java/lang/Object");
    pub const CLASS: Self = Self::name("java/lang/Class");
    pub const STRING: Self = Self::name("java/lang/String");
    pub const BOOLEAN: Self = Self::name("java/lang/Boolean");
    pub const BYTE: Self = Self::name("java/lang/Byte");
    pub const CHARACTER: Self = Self::name("java/lang/Character");
    pub const SHORT: Self = Self::name("java/lang/Short");
    pub const INTEGER: Self = Self::name("java/lang/Integer");
    pub const LONG: Self = Self::name("java/lang/Long");
    pub const FLOAT: Self = Self::name("java/lang/Float");
    pub const DOUBLE: Self = Self::name("java/lang/Double");
    pub const NUMBER: Self = Self::name("java/lang/Number");
    pub const TYPE: Self = Self::name("java/lang/reflect/Type");

    // Gson runtime names
    pub const GSON: Self = Self::name("com/google/gson/Gson");
    pub const GSONBUILDER: Self = Self::name("com/google/gson/GsonBuilder");
    pub const TYPEADAPTER: Self = Self::name("com/google/gson/TypeAdapter");
    pub const TYPETOKEN: Self = Self::name("com/google/gson/reflect/TypeToken");
    pub const JSONWRITER: Self = Self::name("com/google/gson/stream/JsonWriter");
    pub const JSONREADER: Self = Self::name("com/google/gson/stream/JsonReader");
    pub const INSTANCECREATOR: Self = Self::name("com/google/gson/InstanceCreator");
    pub const SERIALIZEDNAME: Self = Self::name("com/google/gson/annotations/SerializedName");
    pub const EXPOSE: Self = Self::name("com/google/gson/annotations/Expose");

    // Template classes patched during code generation
    pub const FACTORYTEMPLATE: Self = Self::name("gsonopt/_OptimizedTypeAdapterFactory");
    pub const ADAPTERTEMPLATE: Self = Self::name("gsonopt/_OptimizedTypeAdapterImpl");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(BinaryName::from_string(String::from("com/example/Order")).is_ok());
        assert!(BinaryName::from_string(String::from("Order")).is_ok());
        assert!(BinaryName::from_string(String::from("")).is_err());
        assert!(BinaryName::from_string(String::from("com//Order")).is_err());
        assert!(UnqualifiedName::from_string(String::from("customerName")).is_ok());
        assert!(UnqualifiedName::from_string(String::from("toJson$3")).is_ok());
        assert!(UnqualifiedName::from_string(String::from("<init>")).is_ok());
        assert!(UnqualifiedName::from_string(String::from("bad.name")).is_err());
    }

    #[test]
    fn dotted_rendering() {
        let name = BinaryName::from_string(String::from("com/example/Order")).unwrap();
        assert_eq!(name.dotted(), "com.example.Order");
    }

    #[test]
    fn generated_member_names() {
        let to_json = UnqualifiedName::TOJSONPREFIX.concat(&UnqualifiedName::number(7));
        assert_eq!(to_json.as_str(), "toJson$7");
    }
}
