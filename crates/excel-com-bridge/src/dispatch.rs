//! Late-bound IDispatch access for Excel's object model.
//!
//! Every call goes through [`DispatchObject::invoke`]; the typed getters on
//! top of it return `Ok(None)` for properties that exist but hold a value
//! of another type, and `Err` when the call itself fails.

#![cfg(windows)]

use std::mem::ManuallyDrop;
use std::ptr;

use windows::{
    core::{BSTR, GUID, HSTRING, PCWSTR},
    Win32::{
        Foundation::{DISP_E_EXCEPTION, VARIANT_BOOL},
        Globalization::GetSystemDefaultLCID,
        System::{
            Com::{
                CLSIDFromProgID, CoCreateInstance, IDispatch, CLSCTX_LOCAL_SERVER, DISPATCH_FLAGS,
                DISPATCH_METHOD, DISPATCH_PROPERTYGET, DISPATCH_PROPERTYPUT, DISPPARAMS,
                EXCEPINFO,
            },
            Ole::DISPID_PROPERTYPUT,
            Variant::{
                VARIANT, VT_BOOL, VT_BSTR, VT_DATE, VT_DISPATCH, VT_EMPTY, VT_ERROR, VT_I2, VT_I4,
                VT_NULL, VT_R4, VT_R8, VT_UI1,
            },
        },
    },
};

// VARIANT wraps its unions in ManuallyDrop; fields are written with ptr::write.

pub fn variant_bool(val: bool) -> VARIANT {
    unsafe {
        let mut v = VARIANT::default();
        let inner = &mut *v.Anonymous.Anonymous;
        ptr::write(&mut inner.vt, VT_BOOL);
        ptr::write(
            &mut inner.Anonymous.boolVal,
            VARIANT_BOOL(if val { -1 } else { 0 }),
        );
        v
    }
}

pub fn variant_i32(val: i32) -> VARIANT {
    unsafe {
        let mut v = VARIANT::default();
        let inner = &mut *v.Anonymous.Anonymous;
        ptr::write(&mut inner.vt, VT_I4);
        ptr::write(&mut inner.Anonymous.lVal, val);
        v
    }
}

pub fn variant_str(val: &str) -> VARIANT {
    unsafe {
        let bstr = BSTR::from(val);
        let mut v = VARIANT::default();
        let inner = &mut *v.Anonymous.Anonymous;
        ptr::write(&mut inner.vt, VT_BSTR);
        ptr::write(&mut inner.Anonymous.bstrVal, ManuallyDrop::new(bstr));
        v
    }
}

pub fn variant_vt(v: &VARIANT) -> u16 {
    unsafe { v.Anonymous.Anonymous.vt.0 }
}

pub fn variant_get_bool(v: &VARIANT) -> Option<bool> {
    unsafe {
        let inner = &v.Anonymous.Anonymous;
        (inner.vt == VT_BOOL).then(|| inner.Anonymous.boolVal.0 != 0)
    }
}

/// Numeric VARIANTs of any width as f64. `VT_DATE` is excluded.
pub fn variant_get_f64(v: &VARIANT) -> Option<f64> {
    unsafe {
        let vt = v.Anonymous.Anonymous.vt;
        let anon = &v.Anonymous.Anonymous.Anonymous;
        match vt {
            VT_R8 => Some(anon.dblVal),
            VT_R4 => Some(anon.fltVal as f64),
            VT_I4 => Some(anon.lVal as f64),
            VT_I2 => Some(anon.iVal as f64),
            VT_UI1 => Some(anon.bVal as f64),
            _ => None,
        }
    }
}

/// OLE automation date serial of a `VT_DATE` VARIANT.
pub fn variant_get_date(v: &VARIANT) -> Option<f64> {
    unsafe {
        let inner = &v.Anonymous.Anonymous;
        (inner.vt == VT_DATE).then(|| inner.Anonymous.date)
    }
}

pub fn variant_get_string(v: &VARIANT) -> Option<String> {
    unsafe {
        let inner = &v.Anonymous.Anonymous;
        (inner.vt == VT_BSTR).then(|| inner.Anonymous.bstrVal.to_string())
    }
}

/// Excel's `xlErrXxx` code of a `VT_ERROR` VARIANT.
pub fn variant_get_error(v: &VARIANT) -> Option<i32> {
    unsafe {
        let inner = &v.Anonymous.Anonymous;
        (inner.vt == VT_ERROR).then(|| inner.Anonymous.scode)
    }
}

fn variant_get_dispatch(v: &VARIANT) -> Option<IDispatch> {
    unsafe {
        if v.Anonymous.Anonymous.vt == VT_DISPATCH {
            let opt_disp: &Option<IDispatch> = &v.Anonymous.Anonymous.Anonymous.pdispVal;
            opt_disp.clone()
        } else {
            None
        }
    }
}

pub fn variant_is_empty(v: &VARIANT) -> bool {
    unsafe {
        let vt = v.Anonymous.Anonymous.vt;
        vt == VT_EMPTY || vt == VT_NULL
    }
}

/// A late-bound COM object.
#[derive(Clone)]
pub struct DispatchObject {
    inner: IDispatch,
}

impl DispatchObject {
    /// Create a COM object from a ProgID string (e.g., "Excel.Application").
    pub fn create_from_progid(progid: &str) -> Result<Self, String> {
        unsafe {
            let hstr = HSTRING::from(progid);
            let clsid =
                CLSIDFromProgID(&hstr).map_err(|e| format!("CLSIDFromProgID failed: {e}"))?;
            let disp: IDispatch = CoCreateInstance(&clsid, None, CLSCTX_LOCAL_SERVER)
                .map_err(|e| format!("CoCreateInstance failed for '{progid}': {e}"))?;
            Ok(Self { inner: disp })
        }
    }

    fn get_dispid(&self, name: &str) -> Result<i32, String> {
        unsafe {
            let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
            let names = [PCWSTR(wide.as_ptr())];
            let mut dispid = 0i32;
            self.inner
                .GetIDsOfNames(
                    &GUID::zeroed(),
                    names.as_ptr(),
                    1,
                    GetSystemDefaultLCID(),
                    &mut dispid,
                )
                .map_err(|e| format!("GetIDsOfNames('{name}') failed: {e}"))?;
            Ok(dispid)
        }
    }

    /// Invoke a member. `args` are in natural order.
    fn invoke(&self, name: &str, flags: DISPATCH_FLAGS, args: &[VARIANT]) -> Result<VARIANT, String> {
        let dispid = self.get_dispid(name)?;
        // DISPPARAMS takes arguments last-to-first.
        let mut reversed: Vec<VARIANT> = args.iter().rev().cloned().collect();
        let mut named_put = [DISPID_PROPERTYPUT];
        let is_put = flags == DISPATCH_PROPERTYPUT;
        let params = DISPPARAMS {
            rgvarg: if reversed.is_empty() {
                ptr::null_mut()
            } else {
                reversed.as_mut_ptr()
            },
            rgdispidNamedArgs: if is_put {
                named_put.as_mut_ptr()
            } else {
                ptr::null_mut()
            },
            cArgs: reversed.len() as u32,
            cNamedArgs: u32::from(is_put),
        };
        let mut result = VARIANT::default();
        let mut except = EXCEPINFO::default();
        unsafe {
            self.inner
                .Invoke(
                    dispid,
                    &GUID::zeroed(),
                    GetSystemDefaultLCID(),
                    flags,
                    &params,
                    if is_put { None } else { Some(&mut result) },
                    Some(&mut except),
                    None,
                )
                .map_err(|e| format_invoke_error(e, &except, name))?;
        }
        Ok(result)
    }

    /// `obj.Name`
    pub fn get_property(&self, name: &str) -> Result<VARIANT, String> {
        self.invoke(name, DISPATCH_PROPERTYGET, &[])
    }

    /// `obj.Name(args...)` as a property read, e.g. `Cells(r, c)`.
    pub fn get_property_with(&self, name: &str, args: &[VARIANT]) -> Result<VARIANT, String> {
        self.invoke(name, DISPATCH_PROPERTYGET, args)
    }

    /// `obj.Name = value`
    pub fn set_property(&self, name: &str, value: VARIANT) -> Result<(), String> {
        self.invoke(name, DISPATCH_PROPERTYPUT, &[value]).map(|_| ())
    }

    pub fn invoke_method(&self, name: &str, args: &[VARIANT]) -> Result<VARIANT, String> {
        self.invoke(name, DISPATCH_METHOD, args)
    }

    pub fn get_child(&self, name: &str) -> Result<DispatchObject, String> {
        extract_dispatch(&self.get_property(name)?, name)
    }

    pub fn invoke_child(&self, name: &str, args: &[VARIANT]) -> Result<DispatchObject, String> {
        extract_dispatch(&self.invoke_method(name, args)?, name)
    }

    /// `Worksheets(1)`, `Range("A1")`, `Cells(r, c)`.
    pub fn get_indexed(&self, name: &str, args: &[VARIANT]) -> Result<DispatchObject, String> {
        extract_dispatch(&self.get_property_with(name, args)?, name)
    }

    /// `Item(i)` of a 1-based collection.
    pub fn item(&self, index: i32) -> Result<DispatchObject, String> {
        self.get_indexed("Item", &[variant_i32(index)])
    }

    /// `Count` of a collection.
    pub fn count(&self) -> Result<i32, String> {
        Ok(self.get_f64("Count")?.unwrap_or(0.0) as i32)
    }

    pub fn get_f64(&self, name: &str) -> Result<Option<f64>, String> {
        Ok(variant_get_f64(&self.get_property(name)?))
    }

    pub fn get_i32(&self, name: &str) -> Result<Option<i32>, String> {
        Ok(self.get_f64(name)?.map(|v| v as i32))
    }

    pub fn get_bool(&self, name: &str) -> Result<Option<bool>, String> {
        let v = self.get_property(name)?;
        // Office tristate properties come back as VT_I4 (-1 true, 0 false).
        Ok(variant_get_bool(&v).or_else(|| variant_get_f64(&v).map(|n| n != 0.0)))
    }

    pub fn get_string(&self, name: &str) -> Result<Option<String>, String> {
        Ok(variant_get_string(&self.get_property(name)?))
    }
}

fn extract_dispatch(variant: &VARIANT, context: &str) -> Result<DispatchObject, String> {
    if let Some(disp) = variant_get_dispatch(variant) {
        Ok(DispatchObject { inner: disp })
    } else if variant_is_empty(variant) {
        Err(format!("'{context}' returned empty/null"))
    } else {
        let vt = variant_vt(variant);
        Err(format!(
            "'{context}' returned non-object VARIANT (VT={vt}), expected VT_DISPATCH"
        ))
    }
}

/// Format an Invoke error, including EXCEPINFO details if available.
fn format_invoke_error(err: windows::core::Error, except: &EXCEPINFO, member_name: &str) -> String {
    if err.code().0 as u32 == DISP_E_EXCEPTION.0 as u32 {
        let desc = if except.bstrDescription.is_empty() {
            String::from("(no description)")
        } else {
            except.bstrDescription.to_string()
        };
        format!("COM exception in '{member_name}': {desc}")
    } else {
        format!("Invoke('{member_name}') failed: {err}")
    }
}
